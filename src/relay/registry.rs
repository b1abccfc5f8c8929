//! Session registry
//!
//! The set of open sessions, keyed by session id. The registry lock only
//! guards the map itself: fan-out works on a `snapshot()` so delivery never
//! holds up connects or disconnects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::session::{Session, SessionId};

#[derive(Debug, Default)]
pub struct Registry {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session. Sessions are keyed by their unique id, so distinct
    /// connections from the same user are tracked separately.
    pub fn add(&self, session: Arc<Session>) {
        self.lock().insert(session.id().clone(), session);
    }

    /// Stop tracking a session. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.lock().remove(id)
    }

    /// Point-in-time list of the tracked sessions, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
