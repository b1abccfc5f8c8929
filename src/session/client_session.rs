use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::relay::message::Identity;

pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Authenticated but not yet registered with the relay.
    Connecting,
    /// Registered; receives live traffic.
    Open,
    /// Terminal.
    Closed,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("session is not open")]
    Closed,
    #[error("connection writer has gone away")]
    ChannelClosed,
    #[error("outbound queue is full")]
    Backpressure,
}

/// A connected, authenticated client.
///
/// Holds the sending side of the bounded per-connection channel drained by
/// the transport's write loop. Delivery never blocks: it either queues the
/// frame or fails immediately, including when the peer has stopped reading
/// and the queue is full.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    identity: Identity,
    expires_at: Option<DateTime<Utc>>,
    state: AtomicU8,
    closed_signal: Notify,
    sender: Sender<WsMessage>,
}

impl Session {
    /// Create a session in the `Connecting` state. The `id` is a fresh UUID.
    pub fn new(identity: Identity, sender: Sender<WsMessage>) -> Self {
        Self {
            id: format!("session-{}", Uuid::new_v4()),
            identity,
            expires_at: None,
            state: AtomicU8::new(SessionState::Connecting as u8),
            closed_signal: Notify::new(),
            sender,
        }
    }

    /// Attach the instant after which the session's credential is no longer
    /// valid for sending.
    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// `Connecting -> Open`. Returns false if the session was already open
    /// or has been closed.
    pub fn open(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `Closed`. Returns true if this call performed the transition.
    pub fn close(&self) -> bool {
        let transitioned =
            self.state.swap(SessionState::Closed as u8, Ordering::AcqRel) != SessionState::Closed as u8;
        if transitioned {
            self.closed_signal.notify_waiters();
        }
        transitioned
    }

    /// Resolves once the session is `Closed`.
    pub async fn closed(&self) {
        loop {
            let notified = self.closed_signal.notified();
            if self.state() == SessionState::Closed {
                return;
            }
            notified.await;
        }
    }

    /// Queue a frame for the peer.
    pub fn deliver(&self, frame: WsMessage) -> Result<(), DeliveryError> {
        if !self.is_open() {
            return Err(DeliveryError::Closed);
        }
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backpressure,
            TrySendError::Closed(_) => DeliveryError::ChannelClosed,
        })
    }
}
