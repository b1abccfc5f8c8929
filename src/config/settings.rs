use serde::Deserialize;

use crate::relay::engine::DEFAULT_OUTBOUND_QUEUE;
use crate::relay::replay::DEFAULT_REPLAY_CAPACITY;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// Defines the bind address, how many sessions may be open at once and how
/// long a connection may sit in the upgrade handshake.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    /// How long a client may take to complete the WebSocket upgrade.
    pub handshake_timeout_ms: u64,
}

/// Configuration settings for the relay core.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    /// How many recent messages are kept for replay to new sessions.
    pub replay_capacity: usize,
    /// Whether a stroke is also delivered back to the session that sent it.
    pub echo_to_sender: bool,
    /// Live frames a slow session may have pending before it is dropped.
    pub outbound_queue: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    #[default]
    Jwt,
    TrustedHeader,
}

/// Configuration settings for connection authentication.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub provider: AuthProvider,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    /// Header carrying the display name when `provider = "trusted_header"`.
    pub identity_header: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled from
/// `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub auth: Option<PartialAuthSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_connections: Option<usize>,
    pub handshake_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialRelaySettings {
    pub replay_capacity: Option<usize>,
    pub echo_to_sender: Option<bool>,
    pub outbound_queue: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialAuthSettings {
    pub provider: Option<AuthProvider>,
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: Option<u64>,
    pub identity_header: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8888,
                max_connections: 1000,
                handshake_timeout_ms: 10_000,
            },
            relay: RelaySettings {
                replay_capacity: DEFAULT_REPLAY_CAPACITY,
                echo_to_sender: true,
                outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            },
            auth: AuthSettings {
                provider: AuthProvider::Jwt,
                jwt_secret: "change-me".to_string(),
                token_ttl_secs: 24 * 60 * 60,
                identity_header: "x-forwarded-user".to_string(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from `defaults`.
    pub fn merge_onto(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let relay = self.relay.unwrap_or_default();
        let auth = self.auth.unwrap_or_default();
        let logging = self.logging.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
                max_connections: server
                    .max_connections
                    .unwrap_or(defaults.server.max_connections),
                handshake_timeout_ms: server
                    .handshake_timeout_ms
                    .unwrap_or(defaults.server.handshake_timeout_ms),
            },
            relay: RelaySettings {
                replay_capacity: relay
                    .replay_capacity
                    .unwrap_or(defaults.relay.replay_capacity),
                echo_to_sender: relay.echo_to_sender.unwrap_or(defaults.relay.echo_to_sender),
                outbound_queue: relay
                    .outbound_queue
                    .unwrap_or(defaults.relay.outbound_queue),
            },
            auth: AuthSettings {
                provider: auth.provider.unwrap_or(defaults.auth.provider),
                jwt_secret: auth.jwt_secret.unwrap_or(defaults.auth.jwt_secret),
                token_ttl_secs: auth.token_ttl_secs.unwrap_or(defaults.auth.token_ttl_secs),
                identity_header: auth
                    .identity_header
                    .unwrap_or(defaults.auth.identity_header),
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(defaults.logging.level),
            },
        }
    }
}
