//! ============================================================================
//! Session Store - Injection records and memory caches
//! ============================================================================
//! Owned state object replacing ambient module globals: which sessions have
//! already received an injection, what each session was served, and the
//! shared pre-warmed cache. One mutex guards all three so the injection
//! check-and-mark plus the cache write form a single critical section; no
//! await happens while the lock is held.
//! ============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::types::MemoryItem;

#[derive(Default)]
struct SessionState {
    injected: HashSet<String>,
    per_session: HashMap<String, Vec<MemoryItem>>,
    shared: Vec<MemoryItem>,
}

/// Process-lifetime session state. Entries are never evicted; the set is
/// bounded by process restart.
#[derive(Default)]
pub struct SessionStore {
    state: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().expect("session store poisoned")
    }

    /// Drop all session records and caches
    pub fn clear(&self) {
        let mut state = self.lock();
        *state = SessionState::default();
    }

    /// Has this session already received an injection via the primary path?
    pub fn is_injected(&self, session_id: &str) -> bool {
        let state = self.lock();
        state.injected.contains(session_id)
    }

    /// Atomically claim the injection slot for a session and record the
    /// served memory set. Returns false if the session was already claimed,
    /// in which case nothing is written.
    pub fn try_mark_injected(&self, session_id: &str, items: Vec<MemoryItem>) -> bool {
        let mut state = self.lock();
        if !state.injected.insert(session_id.to_string()) {
            return false;
        }
        state.per_session.insert(session_id.to_string(), items);
        true
    }

    /// The memory set served to a session, if it was injected
    pub fn served(&self, session_id: &str) -> Option<Vec<MemoryItem>> {
        let state = self.lock();
        state.per_session.get(session_id).cloned()
    }

    /// Snapshot of the shared pre-warmed cache
    pub fn shared(&self) -> Vec<MemoryItem> {
        let state = self.lock();
        state.shared.clone()
    }

    /// Overwrite the shared cache (pre-warm and refresh paths)
    pub fn replace_shared(&self, items: Vec<MemoryItem>) {
        let mut state = self.lock();
        state.shared = items;
    }

    /// Number of sessions that have received an injection
    pub fn injected_count(&self) -> usize {
        let state = self.lock();
        state.injected.len()
    }

    /// Number of entries in the shared cache
    pub fn shared_count(&self) -> usize {
        let state = self.lock();
        state.shared.len()
    }
}
