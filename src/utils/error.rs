//! The `error` module defines the top-level error type of the `webdraw`
//! application.
//!
//! Errors that are recovered inside the relay (malformed strokes, failed
//! deliveries, rejected handshakes) never surface here; `RelayError` covers
//! what can stop the server or a CLI command.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("invalid stroke payload: {0}")]
    Payload(#[from] serde_json::Error),
}
