use super::settings::Settings;
use super::{AuthProvider, load_config_from};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8888);
    assert_eq!(settings.server.max_connections, 1000);
    assert_eq!(settings.server.handshake_timeout_ms, 10_000);
    assert_eq!(settings.relay.replay_capacity, 200);
    assert_eq!(settings.relay.outbound_queue, 64);
    assert!(settings.relay.echo_to_sender);
    assert_eq!(settings.auth.provider, AuthProvider::Jwt);
    assert_eq!(settings.auth.identity_header, "x-forwarded-user");
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.port, 8888);
    assert_eq!(cfg.relay.replay_capacity, 200);
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000
        handshake_timeout_ms = 2500

        [relay]
        replay_capacity = 50
        echo_to_sender = false
        outbound_queue = 8

        [auth]
        provider = "trusted_header"
        identity_header = "x-auth-user"
    "#;
    fs::write(tmp.path().join("webdraw.toml"), toml).expect("write config file");

    let path = tmp.path().join("webdraw");
    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");

    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.max_connections, 1000);
    assert_eq!(cfg.server.handshake_timeout_ms, 2500);
    assert_eq!(cfg.relay.replay_capacity, 50);
    assert_eq!(cfg.relay.outbound_queue, 8);
    assert!(!cfg.relay.echo_to_sender);
    assert_eq!(cfg.auth.provider, AuthProvider::TrustedHeader);
    assert_eq!(cfg.auth.identity_header, "x-auth-user");
    assert_eq!(cfg.auth.jwt_secret, "change-me");
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(
        tmp.path().join("webdraw.toml"),
        "[server]\nport = 9000\n[auth]\njwt_secret = \"file_secret\"\n",
    )
    .expect("write config file");
    let path = tmp.path().join("webdraw");

    temp_env::with_vars(
        [
            ("WEBDRAW__SERVER__PORT", Some("9100")),
            ("WEBDRAW__AUTH__JWT_SECRET", Some("env_secret")),
            ("WEBDRAW__RELAY__REPLAY_CAPACITY", Some("3")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.auth.jwt_secret, "env_secret");
            assert_eq!(cfg.relay.replay_capacity, 3);
        },
    );
}

#[test]
#[serial]
fn test_unknown_provider_is_rejected() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(
        tmp.path().join("webdraw.toml"),
        "[auth]\nprovider = \"carrier_pigeon\"\n",
    )
    .expect("write config file");
    let path = tmp.path().join("webdraw");

    assert!(load_config_from(path.to_str().unwrap()).is_err());
}
