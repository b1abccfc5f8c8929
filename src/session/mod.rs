//! The `session` module defines the representation of a connected client.
//!
//! A `Session` pairs the identity established during authentication with the
//! channel used to push frames to the peer, and tracks the
//! `Connecting -> Open -> Closed` lifecycle.

pub mod client_session;
pub use client_session::{DeliveryError, Session, SessionId, SessionState};
