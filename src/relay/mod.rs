//! The `relay` module is the core of the server: the set of open sessions,
//! the bounded replay cache, and the engine that records and fans out
//! inbound strokes.

pub mod engine;
pub mod message;
pub mod registry;
pub mod replay;

pub use engine::{FanoutReport, InboundOutcome, Relay, RelayOptions};
pub use message::{Identity, Message};
pub use registry::Registry;
pub use replay::ReplayCache;
