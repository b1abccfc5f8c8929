//! Signed-token authentication
//!
//! Clients present an HS256 JWT either as a `token` query parameter (browsers
//! cannot set headers on a WebSocket upgrade) or as an
//! `Authorization: Bearer` header. The `sub` claim is the display name and
//! `exp` bounds how long the session may send.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthRequest, AuthenticatedUser, Authenticator};
use crate::config::AuthSettings;
use crate::relay::message::Identity;

const TOKEN_QUERY_PARAM: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl_secs: u64,
}

impl JwtAuthenticator {
    pub fn new(secret: &str, token_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            token_ttl_secs,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(&settings.jwt_secret, settings.token_ttl_secs)
    }

    /// Sign a token for `user` valid for the configured lifetime.
    pub fn issue(&self, user: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_with_ttl(user, self.token_ttl_secs)
    }

    pub fn issue_with_ttl(
        &self,
        user: &str,
        ttl_secs: u64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = Utc::now().timestamp().saturating_add_unsigned(ttl_secs);
        self.sign(&Claims {
            sub: user.to_string(),
            exp: exp.max(0) as usize,
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    fn extract_token(request: &AuthRequest) -> Option<&str> {
        if let Some(token) = request.query_param(TOKEN_QUERY_PARAM) {
            return Some(token);
        }
        // Auth scheme names are case-insensitive
        let (scheme, token) = request.header("authorization")?.trim().split_once(' ')?;
        scheme
            .eq_ignore_ascii_case("bearer")
            .then(|| token.trim())
    }
}

impl Authenticator for JwtAuthenticator {
    fn name(&self) -> &'static str {
        "jwt"
    }

    fn authenticate(&self, request: &AuthRequest) -> Result<AuthenticatedUser, AuthError> {
        let token = Self::extract_token(request)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredentials)?;
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }

        Ok(AuthenticatedUser {
            identity: Identity::new(claims.sub),
            expires_at: i64::try_from(claims.exp)
                .ok()
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        })
    }
}
