//! In-memory keyed store guarded by a single reader/writer lock.

use crate::types::{StoreState, StoreStats, UrlRecord};
use parking_lot::RwLock;

/// The table of short key -> record plus the mint counter.
///
/// Every access goes through one process-wide RwLock: readers share, writers
/// exclude. The read-modify-write operations (`next_counter`,
/// `increment_clicks`) hold the write lock for their whole duration, so
/// concurrent callers can never observe duplicates or lose updates.
///
/// Constructed once at startup (from recovered state) and handed to every
/// operation; there is no global instance.
#[derive(Debug, Default)]
pub struct UrlStore {
    state: RwLock<StoreState>,
}

impl UrlStore {
    /// An empty store with counter 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with recovered state.
    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Issue the next counter value.
    ///
    /// No two callers ever observe the same returned value, under any
    /// concurrent call pattern.
    pub fn next_counter(&self) -> u64 {
        let mut state = self.state.write();
        state.current_id += 1;
        state.current_id
    }

    /// Insert or overwrite a record.
    pub fn put(&self, key: impl Into<String>, record: UrlRecord) {
        self.state.write().urls.insert(key.into(), record);
    }

    /// Look up a record by key.
    pub fn get(&self, key: &str) -> Option<UrlRecord> {
        self.state.read().urls.get(key).cloned()
    }

    /// Bump the click count for a key.
    ///
    /// Returns the updated record and the counter value observed at write
    /// time (which the journal entry carries), or `None` for an unknown key.
    /// The whole read-modify-write runs under a single write-lock
    /// acquisition.
    pub fn increment_clicks(&self, key: &str) -> Option<(UrlRecord, u64)> {
        let mut state = self.state.write();
        let current_id = state.current_id;

        let record = state.urls.get_mut(key)?;
        record.clicks += 1;

        Some((record.clone(), current_id))
    }

    /// An independent deep copy of the full state, safe to serialize while
    /// mutation continues.
    pub fn snapshot(&self) -> StoreState {
        self.state.read().clone()
    }

    /// Last issued counter value.
    pub fn current_id(&self) -> u64 {
        self.state.read().current_id
    }

    /// Number of stored links.
    pub fn len(&self) -> usize {
        self.state.read().urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().urls.is_empty()
    }

    /// Aggregate statistics from one consistent read.
    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            url_count: state.urls.len(),
            current_id: state.current_id,
            total_clicks: state.urls.values().map(|r| r.clicks).sum(),
        }
    }
}
