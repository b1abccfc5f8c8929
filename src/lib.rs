//! # webdraw
//!
//! `webdraw` is a real-time fan-out relay for collaborative drawing. Clients
//! connect over WebSockets, send small JSON strokes, and every connected
//! client receives each stroke tagged with the sender's display name. A
//! bounded replay cache lets newly joined clients catch up on recent activity.
//!
//! ## Core Modules
//!
//! - `relay`: the registry of open sessions, the replay cache and the
//!   coordinator that validates, records and fans out inbound strokes.
//! - `session`: one connected client and its outbound channel.
//! - `auth`: the `Authenticator` seam and its concrete providers.
//! - `config`: loads server, relay, auth and logging settings.
//! - `transport`: the WebSocket server that wires connections into the relay.
//! - `utils`: shared error type and logging setup.

pub mod auth;
pub mod config;
pub mod relay;
pub mod session;
pub mod transport;
pub mod utils;

pub use relay::{Identity, Message, Relay};
