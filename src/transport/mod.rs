//! The `transport` module is responsible for network communication with
//! clients over WebSockets.
//!
//! It accepts and authenticates connections, turns each one into a relay
//! session, and pumps frames in both directions.

pub mod websocket;

pub use websocket::{ServeOptions, serve, start_websocket_server};
