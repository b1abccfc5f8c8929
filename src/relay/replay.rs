//! Replay cache
//!
//! A bounded FIFO log of the most recently accepted messages. New sessions
//! receive a snapshot of it, in append order, before any live traffic.
//!
//! Appends take the write lock, snapshots take the read lock, so a snapshot
//! never observes a half-evicted buffer.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use crate::relay::message::Message;

pub const DEFAULT_REPLAY_CAPACITY: usize = 200;

#[derive(Debug)]
pub struct ReplayCache {
    capacity: usize,
    entries: RwLock<VecDeque<Message>>,
}

impl Default for ReplayCache {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_CAPACITY)
    }
}

impl ReplayCache {
    /// Create an empty cache holding at most `capacity` messages.
    /// A capacity of zero keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a message, evicting the oldest entries while over capacity.
    pub fn append(&self, message: Message) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(message);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
