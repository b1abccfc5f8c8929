//! Stroke messages
//!
//! `Message` is the unit that is cached for replay and fanned out to every
//! open session. The payload is an opaque JSON value: the relay never looks
//! inside it, it only attributes it to the sender.
//!
//! Wire format (one WebSocket text frame per message):
//!
//! ```json
//! { "d": <payload as sent by the client>, "u": "<sender display name>" }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tungstenite::protocol::Message as WsMessage;

/// Display name established when a connection authenticates.
///
/// Not unique: the same name may be attached to several concurrent sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "d")]
    pub payload: Value,
    #[serde(rename = "u")]
    pub sender: Identity,
}

impl Message {
    pub fn new(payload: Value, sender: Identity) -> Self {
        Self { payload, sender }
    }

    /// Encode the message as the text frame sent to clients.
    pub fn to_frame(&self) -> Result<WsMessage, serde_json::Error> {
        serde_json::to_string(self).map(WsMessage::text)
    }
}
