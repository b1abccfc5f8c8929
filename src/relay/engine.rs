//! Relay engine
//!
//! `Relay` owns the session registry and the replay cache and implements the
//! three operations the transport needs:
//! - `join`: replay the cache to a new session, then register it
//! - `handle_inbound`: validate a raw frame, record it and fan it out
//! - `leave`: deregister and close a session
//!
//! Concurrency and usage notes:
//! - The relay is shared as `Arc<Relay>`; every method takes `&self`.
//! - `join` and the append + fan-out step of `handle_inbound` run under one
//!   sequencing lock. Every open session therefore sees messages in cache
//!   order, and a joining session sees each message exactly once (either in
//!   the replay or live).
//! - Delivery is a non-blocking channel send, so holding the sequencing lock
//!   across fan-out never waits on a peer's network I/O.
//! - `leave` does not take the sequencing lock.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::RelaySettings;
use crate::relay::message::Message;
use crate::relay::registry::Registry;
use crate::relay::replay::ReplayCache;
use crate::session::{DeliveryError, Session, SessionId};

pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Longest prefix of a rejected payload that ends up in the logs.
const LOG_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Deliver each message back to the session that sent it.
    pub echo_to_sender: bool,
    /// Live frames a session may have queued, on top of a full replay,
    /// before it is dropped as too slow.
    pub outbound_queue: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            echo_to_sender: true,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

/// Result of fanning one message out to the registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub failed: Vec<SessionId>,
}

/// What `Relay::handle_inbound` did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Broadcast(FanoutReport),
    /// Payload was not valid JSON; nothing was recorded or sent.
    Malformed,
    /// Sender is not open or its credential has expired; frame dropped.
    Unauthenticated,
}

#[derive(Debug)]
pub struct Relay {
    registry: Registry,
    replay: ReplayCache,
    options: RelayOptions,
    sequencer: Mutex<()>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(Registry::new(), ReplayCache::default(), RelayOptions::default())
    }
}

impl Relay {
    pub fn new(registry: Registry, replay: ReplayCache, options: RelayOptions) -> Self {
        Self {
            registry,
            replay,
            options,
            sequencer: Mutex::new(()),
        }
    }

    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self::new(
            Registry::new(),
            ReplayCache::new(settings.replay_capacity),
            RelayOptions {
                echo_to_sender: settings.echo_to_sender,
                outbound_queue: settings.outbound_queue,
            },
        )
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn replay(&self) -> &ReplayCache {
        &self.replay
    }

    /// Capacity for a session's outbound channel: room for the whole replay
    /// plus `outbound_queue` live frames.
    pub fn outbound_capacity(&self) -> usize {
        (self.replay.capacity() + self.options.outbound_queue).max(1)
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Open a freshly authenticated session: send it the replay snapshot in
    /// chronological order, then register it for live traffic.
    ///
    /// Returns the number of replayed messages. If the replay cannot be
    /// delivered the session is closed and never registered.
    pub fn join(&self, session: Arc<Session>) -> Result<usize, DeliveryError> {
        let _sequenced = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);

        if !session.open() {
            return Err(DeliveryError::Closed);
        }

        let history = self.replay.snapshot();
        for message in &history {
            let frame = match message.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Failed to encode replay message: {e}");
                    continue;
                }
            };
            if let Err(e) = session.deliver(frame) {
                session.close();
                return Err(e);
            }
        }

        self.registry.add(session.clone());
        debug!(
            "{} joined as {} with {} replayed messages",
            session.id(),
            session.identity(),
            history.len()
        );
        Ok(history.len())
    }

    /// Deregister and close a session. Safe to call more than once.
    pub fn leave(&self, id: &SessionId) {
        if let Some(session) = self.registry.remove(id) {
            session.close();
            debug!("{id} left");
        }
    }

    /// Validate a raw inbound frame from `session`, attribute it to the
    /// session's identity, record it and fan it out.
    pub fn handle_inbound(&self, session: &Session, raw: &str) -> InboundOutcome {
        if !session.is_open() || session.is_expired(Utc::now()) {
            debug!("Dropping frame from unauthenticated session {}", session.id());
            return InboundOutcome::Unauthenticated;
        }

        let payload = match serde_json::from_str::<Value>(raw) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    "Invalid stroke from {}: {err} | {}",
                    session.id(),
                    raw.chars().take(LOG_PREVIEW_CHARS).collect::<String>()
                );
                return InboundOutcome::Malformed;
            }
        };
        debug!("msg from {}: {payload}", session.identity());

        let message = Message::new(payload, session.identity().clone());
        InboundOutcome::Broadcast(self.broadcast(message, Some(session.id())))
    }

    /// Record `message` in the replay cache and deliver it to every open
    /// session. `origin` is skipped when echoing to the sender is disabled.
    ///
    /// A recipient whose delivery fails is removed and closed; the remaining
    /// recipients are still served.
    pub fn broadcast(&self, message: Message, origin: Option<&SessionId>) -> FanoutReport {
        let _sequenced = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);

        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode message: {e}");
                return FanoutReport::default();
            }
        };
        self.replay.append(message);

        let recipients = self.registry.snapshot();
        debug!("sending message to {} sessions", recipients.len());

        let mut report = FanoutReport::default();
        for recipient in recipients {
            if !self.options.echo_to_sender && Some(recipient.id()) == origin {
                continue;
            }
            match recipient.deliver(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Failed to send to {}: {e}", recipient.id());
                    self.registry.remove(recipient.id());
                    recipient.close();
                    report.failed.push(recipient.id().clone());
                }
            }
        }
        report
    }
}
