use relay_core::Turn;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Confirmation returned by [`SessionStore::clear`].
pub const CLEARED_MESSAGE: &str = "Conversation history cleared! Let's start fresh.";

/// Bounded conversation history keyed by identity.
///
/// Sessions are created on first append and only removed by [`clear`](Self::clear).
/// After every mutation a session holds at most `history_cap` turns; older
/// turns are evicted first.
#[derive(Debug)]
pub struct SessionStore {
    history_cap: usize,
    sessions: Mutex<HashMap<String, VecDeque<Turn>>>,
}

impl SessionStore {
    pub fn new(history_cap: usize) -> Self {
        Self {
            history_cap,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    pub fn append(&self, identity: &str, turn: Turn) {
        self.append_and_snapshot(identity, turn);
    }

    /// Append `turn` and return the resulting history, oldest first.
    ///
    /// The append, eviction and copy happen under one lock, so the snapshot
    /// always contains `turn` as its last element.
    pub fn append_and_snapshot(&self, identity: &str, turn: Turn) -> Vec<Turn> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(identity.to_string()).or_default();
        session.push_back(turn);
        while session.len() > self.history_cap {
            session.pop_front();
        }
        session.iter().cloned().collect()
    }

    pub fn history(&self, identity: &str) -> Vec<Turn> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .map(|session| session.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop the identity's session. Clearing an unknown identity is a no-op.
    pub fn clear(&self, identity: &str) -> String {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity);
        debug!(
            identity = %identity,
            turns = removed.map_or(0, |s| s.len()),
            "Session cleared"
        );
        CLEARED_MESSAGE.to_string()
    }

    pub fn tracked_identities(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
