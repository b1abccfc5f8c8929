use super::*;
use crate::config::Settings;
use chrono::Utc;
use tungstenite::client::IntoClientRequest;

const SECRET: &str = "test_secret";

#[test]
fn auth_request_parses_query_and_headers() {
    let request = AuthRequest::new()
        .with_query("room=main&token=abc.def.ghi&flag")
        .with_header("X-Forwarded-User", "alice");

    assert_eq!(request.query_param("token"), Some("abc.def.ghi"));
    assert_eq!(request.query_param("room"), Some("main"));
    assert_eq!(request.query_param("flag"), Some(""));
    assert_eq!(request.header("x-forwarded-user"), Some("alice"));
    assert_eq!(request.header("X-FORWARDED-USER"), Some("alice"));
}

#[test]
fn auth_request_from_upgrade_request() {
    let mut request = "ws://localhost/ws?token=t0k3n".into_client_request().unwrap();
    request
        .headers_mut()
        .insert("x-forwarded-user", "bob".parse().unwrap());

    let auth_request = AuthRequest::from_http_request(&request);
    assert_eq!(auth_request.query_param("token"), Some("t0k3n"));
    assert_eq!(auth_request.header("X-Forwarded-User"), Some("bob"));
}

#[test]
fn jwt_accepts_token_from_query() {
    let authenticator = JwtAuthenticator::new(SECRET, 3600);
    let token = authenticator.issue("alice").unwrap();
    let request = AuthRequest::new().with_query(&format!("token={token}"));

    let user = authenticator.authenticate(&request).unwrap();
    assert_eq!(user.identity, Identity::from("alice"));
    assert!(user.expires_at.unwrap() > Utc::now());
}

#[test]
fn jwt_accepts_bearer_header() {
    let authenticator = JwtAuthenticator::new(SECRET, 3600);
    let token = authenticator.issue("bob").unwrap();
    let request = AuthRequest::new().with_header("Authorization", &format!("Bearer {token}"));

    let user = authenticator.authenticate(&request).unwrap();
    assert_eq!(user.identity.as_str(), "bob");
}

#[test]
fn auth_request_decodes_query_values() {
    let request = AuthRequest::new().with_query("name=x+y%20z&sym=%26%3D");
    assert_eq!(request.query_param("name"), Some("x y z"));
    assert_eq!(request.query_param("sym"), Some("&="));
}

#[test]
fn jwt_accepts_percent_encoded_token() {
    let authenticator = JwtAuthenticator::new(SECRET, 3600);
    let token = authenticator.issue("alice").unwrap();
    let encoded = token.replace('.', "%2E");
    let request = AuthRequest::new().with_query(&format!("token={encoded}"));

    let user = authenticator.authenticate(&request).unwrap();
    assert_eq!(user.identity.as_str(), "alice");
}

#[test]
fn jwt_bearer_scheme_is_case_insensitive() {
    let authenticator = JwtAuthenticator::new(SECRET, 3600);
    let token = authenticator.issue("bob").unwrap();

    for scheme in ["bearer", "BEARER", "Bearer"] {
        let request =
            AuthRequest::new().with_header("Authorization", &format!("{scheme} {token}"));
        let user = authenticator.authenticate(&request).unwrap();
        assert_eq!(user.identity.as_str(), "bob");
    }

    let basic = AuthRequest::new().with_header("Authorization", &format!("Basic {token}"));
    assert!(matches!(
        authenticator.authenticate(&basic),
        Err(AuthError::MissingCredentials)
    ));
}

#[test]
fn jwt_rejects_missing_token() {
    let authenticator = JwtAuthenticator::new(SECRET, 3600);
    let result = authenticator.authenticate(&AuthRequest::new());
    assert!(matches!(result, Err(AuthError::MissingCredentials)));
}

#[test]
fn jwt_rejects_foreign_signature() {
    let other = JwtAuthenticator::new("someone_else", 3600);
    let token = other.issue("mallory").unwrap();

    let authenticator = JwtAuthenticator::new(SECRET, 3600);
    let request = AuthRequest::new().with_query(&format!("token={token}"));
    assert!(matches!(
        authenticator.authenticate(&request),
        Err(AuthError::InvalidToken(_))
    ));
}

#[test]
fn jwt_rejects_expired_token() {
    let authenticator = JwtAuthenticator::new(SECRET, 3600);
    let token = authenticator
        .sign(&Claims {
            sub: "alice".to_string(),
            exp: (Utc::now().timestamp() - 3600) as usize,
        })
        .unwrap();
    let request = AuthRequest::new().with_query(&format!("token={token}"));

    assert!(matches!(
        authenticator.authenticate(&request),
        Err(AuthError::InvalidToken(_))
    ));
}

#[test]
fn jwt_rejects_empty_subject() {
    let authenticator = JwtAuthenticator::new(SECRET, 3600);
    let token = authenticator.issue("  ").unwrap();
    let request = AuthRequest::new().with_query(&format!("token={token}"));

    assert!(matches!(
        authenticator.authenticate(&request),
        Err(AuthError::MissingSubject)
    ));
}

#[test]
fn trusted_header_yields_name() {
    let authenticator = TrustedHeaderAuthenticator::new("X-Forwarded-User");
    let request = AuthRequest::new().with_header("x-forwarded-user", " Carol ");

    let user = authenticator.authenticate(&request).unwrap();
    assert_eq!(user.identity.as_str(), "Carol");
    assert!(user.expires_at.is_none());
}

#[test]
fn trusted_header_rejects_missing_or_empty() {
    let authenticator = TrustedHeaderAuthenticator::new("x-forwarded-user");

    assert!(matches!(
        authenticator.authenticate(&AuthRequest::new()),
        Err(AuthError::MissingCredentials)
    ));
    assert!(matches!(
        authenticator.authenticate(&AuthRequest::new().with_header("x-forwarded-user", "")),
        Err(AuthError::InvalidIdentityHeader(_))
    ));
}

#[test]
fn from_settings_selects_provider() {
    let mut settings = Settings::default().auth;
    assert_eq!(from_settings(&settings).name(), "jwt");

    settings.provider = AuthProvider::TrustedHeader;
    assert_eq!(from_settings(&settings).name(), "trusted_header");
}
