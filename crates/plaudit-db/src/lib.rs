pub mod listing;
pub mod store;
pub mod summary;

use std::sync::Mutex;

use crate::store::RecordStore;
use crate::summary::SummaryCache;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("review not found: {0}")]
    NotFound(String),
    #[error("review store lock poisoned: {0}")]
    Poisoned(String),
}

/// Everything guarded by the database lock: the review records and the
/// summaries derived from them.
#[derive(Debug, Default)]
pub struct State {
    pub reviews: RecordStore,
    pub summaries: SummaryCache,
}

impl State {
    /// Recompute and cache the summary for `item_id` from the current records.
    /// Call after any write that changes an item's set of ratings.
    pub fn refresh_summary(&mut self, item_id: &str) {
        self.summaries.refresh(item_id, &self.reviews);
    }
}

/// In-memory review database, constructed once at startup and shared by handle.
///
/// One lock covers both the records and the summary cache, so a write and the
/// summary recompute it triggers are never observed half-done.
#[derive(Debug, Default)]
pub struct Database {
    state: Mutex<State>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the store and summary cache.
    pub fn with_state<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut State) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&mut state)
    }
}
