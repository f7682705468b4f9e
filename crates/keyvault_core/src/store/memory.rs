//! In-process [`DocumentStore`] used by tests and offline tooling.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::DocumentStore;
use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreErrorCode};
use crate::models::paste::{Paste, PasteDocument, Timestamp};

/// Store primitive, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Insert,
    Get,
    IncrementViews,
    Query,
}

#[derive(Default)]
struct MemoryState {
    pastes: HashMap<String, Paste>,
    failures: HashMap<StoreOp, VecDeque<StoreError>>,
    stalled: HashSet<StoreOp>,
    calls: HashMap<StoreOp, u32>,
}

/// Hash-map backed document store.
///
/// Failures can be queued per primitive with [`MemoryStore::fail_next`], and a
/// primitive can be made to hang forever with [`MemoryStore::stall`].
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    state: Mutex<MemoryState>,
    reconnects: AtomicU32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl MemoryStore {
    /// Create an empty store that stamps documents with `clock`.
    pub fn new(clock: impl Clock) -> Self {
        Self {
            clock: Arc::new(clock),
            state: Mutex::new(MemoryState::default()),
            reconnects: AtomicU32::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `error` to be returned by the next call to `op`.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.state()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Make every later call to `op` hang without settling.
    pub fn stall(&self, op: StoreOp) {
        self.state().stalled.insert(op);
    }

    /// Number of calls made to `op`, including failed and stalled ones.
    pub fn calls(&self, op: StoreOp) -> u32 {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of reconnect hints received.
    pub fn reconnects(&self) -> u32 {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Current stored copy of `id`, bypassing injected failures.
    pub fn snapshot(&self, id: &str) -> Option<Paste> {
        self.state().pastes.get(id).cloned()
    }

    /// Put a record in place as-is, keeping its id and timestamps.
    pub fn seed(&self, paste: Paste) {
        self.state().pastes.insert(paste.id.clone(), paste);
    }

    /// Record the call and decide how it proceeds.
    ///
    /// # Returns
    /// `Ok(true)` when the call must hang, `Ok(false)` to proceed.
    ///
    /// # Errors
    /// Returns the next queued failure for `op`.
    fn begin(&self, op: StoreOp) -> Result<bool, StoreError> {
        let mut state = self.state();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(error) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        Ok(state.stalled.contains(&op))
    }

    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.begin(op)? {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    async fn insert(&self, document: PasteDocument) -> Result<String, StoreError> {
        self.enter(StoreOp::Insert).await?;
        let id = Uuid::new_v4().simple().to_string();
        let mut paste = Paste::from_document(id.clone(), document);
        paste.created_at = Timestamp::At(self.clock.now_millis());
        self.state().pastes.insert(id.clone(), paste);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        self.enter(StoreOp::Get).await?;
        Ok(self.state().pastes.get(id).cloned())
    }

    async fn increment_views(&self, id: &str) -> Result<(), StoreError> {
        self.enter(StoreOp::IncrementViews).await?;
        let mut state = self.state();
        let paste = state.pastes.get_mut(id).ok_or_else(|| {
            StoreError::new(StoreErrorCode::NotFound, format!("No paste with id '{}'", id))
        })?;
        paste.views = paste.views.saturating_add(1);
        Ok(())
    }

    async fn query_by_author(&self, author_id: &str) -> Result<Vec<Paste>, StoreError> {
        self.enter(StoreOp::Query).await?;
        Ok(self
            .state()
            .pastes
            .values()
            .filter(|paste| paste.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn enable_network(&self) -> Result<(), StoreError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStore, StoreOp};
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::models::identity::Identity;
    use crate::models::paste::{NewPaste, Timestamp};
    use crate::store::DocumentStore;

    fn document(author: &str) -> crate::models::paste::PasteDocument {
        let identity = Identity {
            id: author.to_string(),
            display_name: author.to_string(),
            photo_url: None,
        };
        NewPaste::for_identity(&identity, "body").into_document(0)
    }

    #[tokio::test]
    async fn insert_assigns_id_and_server_timestamp() {
        let store = MemoryStore::new(ManualClock::new(9_000));
        let id = store.insert(document("a")).await.expect("insert");
        let stored = store.get(&id).await.expect("get").expect("exists");
        assert_eq!(stored.id, id);
        assert_eq!(stored.created_at, Timestamp::At(9_000));
    }

    #[tokio::test]
    async fn queued_failures_are_consumed_in_order() {
        let store = MemoryStore::default();
        store.fail_next(StoreOp::Get, StoreError::unavailable("one"));
        store.fail_next(StoreOp::Get, StoreError::unavailable("two"));

        assert_eq!(store.get("x").await.unwrap_err().message, "one");
        assert_eq!(store.get("x").await.unwrap_err().message, "two");
        assert_eq!(store.get("x").await, Ok(None));
        assert_eq!(store.calls(StoreOp::Get), 3);
    }

    #[tokio::test]
    async fn query_filters_by_author_and_increment_requires_existing_id() {
        let store = MemoryStore::default();
        let mine = store.insert(document("me")).await.expect("insert");
        store.insert(document("other")).await.expect("insert");

        let found = store.query_by_author("me").await.expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, mine);

        store.increment_views(&mine).await.expect("increment");
        assert_eq!(store.snapshot(&mine).map(|p| p.views), Some(1));
        assert!(store.increment_views("missing").await.is_err());
    }
}
