//! Proxy-provided identity
//!
//! For deployments behind an authenticating reverse proxy (OAuth gateway,
//! SSO sidecar) that has already completed the login flow and forwards the
//! user's display name in a request header. The relay trusts the value as-is,
//! so the listener must not be reachable except through that proxy.

use super::{AuthError, AuthRequest, AuthenticatedUser, Authenticator};
use crate::relay::message::Identity;

#[derive(Debug, Clone)]
pub struct TrustedHeaderAuthenticator {
    header: String,
}

impl TrustedHeaderAuthenticator {
    pub fn new(header: &str) -> Self {
        Self {
            header: header.to_ascii_lowercase(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }
}

impl Authenticator for TrustedHeaderAuthenticator {
    fn name(&self) -> &'static str {
        "trusted_header"
    }

    fn authenticate(&self, request: &AuthRequest) -> Result<AuthenticatedUser, AuthError> {
        let name = request
            .header(&self.header)
            .ok_or(AuthError::MissingCredentials)?
            .trim();
        if name.is_empty() {
            return Err(AuthError::InvalidIdentityHeader(self.header.clone()));
        }

        Ok(AuthenticatedUser {
            identity: Identity::from(name),
            expires_at: None,
        })
    }
}
