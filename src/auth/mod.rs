//! The `auth` module turns an incoming upgrade request into an identity.
//!
//! The transport depends only on the [`Authenticator`] trait. Concrete
//! providers are picked from configuration by [`from_settings`]:
//!
//! - [`JwtAuthenticator`]: HS256 bearer token, `sub` claim is the display name
//! - [`TrustedHeaderAuthenticator`]: display name set by an upstream proxy

pub mod jwt;
pub mod trusted_header;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tungstenite::handshake::server::Request;
use url::form_urlencoded;

use crate::config::{AuthProvider, AuthSettings};
use crate::relay::message::Identity;

pub use jwt::{Claims, JwtAuthenticator};
pub use trusted_header::TrustedHeaderAuthenticator;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token has no subject")]
    MissingSubject,
    #[error("identity header `{0}` is empty or not valid UTF-8")]
    InvalidIdentityHeader(String),
}

/// Identity yielded by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    /// After this instant the session may no longer send.
    pub expires_at: Option<DateTime<Utc>>,
}

/// The parts of an upgrade request an authenticator may look at.
///
/// Header names are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl AuthRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Add the parameters of an `application/x-www-form-urlencoded` query
    /// string. Keys and values are percent-decoded.
    pub fn with_query(mut self, query: &str) -> Self {
        self.query.extend(
            form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        );
        self
    }

    /// Capture headers and query parameters from a WebSocket upgrade request.
    /// Headers whose value is not valid UTF-8 are skipped.
    pub fn from_http_request(request: &Request) -> Self {
        let mut auth_request = Self::new();
        for (name, value) in request.headers() {
            if let Ok(value) = value.to_str() {
                auth_request = auth_request.with_header(name.as_str(), value);
            }
        }
        match request.uri().query() {
            Some(query) => auth_request.with_query(query),
            None => auth_request,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

pub trait Authenticator: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    fn authenticate(&self, request: &AuthRequest) -> Result<AuthenticatedUser, AuthError>;
}

/// Build the authenticator selected by `settings.provider`.
pub fn from_settings(settings: &AuthSettings) -> Arc<dyn Authenticator> {
    match settings.provider {
        AuthProvider::Jwt => Arc::new(JwtAuthenticator::from_settings(settings)),
        AuthProvider::TrustedHeader => {
            Arc::new(TrustedHeaderAuthenticator::new(&settings.identity_header))
        }
    }
}

#[cfg(test)]
mod tests;
