//! Paste lifecycle over a remote [`DocumentStore`].
//!
//! Every remote call is wrapped in a timeout nested inside the retry loop.
//! `create` and `get` surface unresolved errors; `list` degrades to an empty
//! result; the view counter is bumped by a detached task whose failures are
//! logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::constants::{DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};
use crate::error::PasteError;
use crate::models::paste::{NewPaste, Paste};
use crate::resilience::{retry_operation, with_timeout, RetryPolicy};
use crate::store::DocumentStore;

/// Message returned when the store rejects the caller.
pub const ACCESS_DENIED_MESSAGE: &str =
    "ACCESS DENIED: sign in with an account that is allowed to access this paste";

const CREATE_TIMEOUT_MESSAGE: &str = "Timed out saving the paste; it may still appear later";
const GET_TIMEOUT_MESSAGE: &str = "Timed out loading the paste";
const LIST_TIMEOUT_MESSAGE: &str = "Timed out loading your pastes";
const VIEWS_TIMEOUT_MESSAGE: &str = "Timed out updating the view counter";

/// Wait budgets and retry policy for store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// How the detached view-count increment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewIncrementOutcome {
    Succeeded,
    FailedIgnored,
}

/// Handle to the background view-count increment started by a fetch.
///
/// Dropping it leaves the task running.
#[derive(Debug)]
pub struct ViewIncrement {
    handle: JoinHandle<ViewIncrementOutcome>,
}

impl ViewIncrement {
    /// Wait for the increment to finish.
    ///
    /// # Returns
    /// The task outcome; a panicked or cancelled task counts as
    /// [`ViewIncrementOutcome::FailedIgnored`].
    pub async fn outcome(self) -> ViewIncrementOutcome {
        self.handle
            .await
            .unwrap_or(ViewIncrementOutcome::FailedIgnored)
    }
}

/// A paste returned by [`PasteStore::get`].
#[derive(Debug)]
pub struct FetchedPaste {
    /// Record as read, before this fetch's own view increment.
    pub paste: Paste,
    pub view_increment: ViewIncrement,
}

impl FetchedPaste {
    /// Consumer-side expiry check. Expired records must be treated as absent.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.paste.is_expired(now_millis)
    }
}

/// Create, fetch, and list pastes against a remote document store.
pub struct PasteStore<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    settings: StoreSettings,
}

impl<S> Clone for PasteStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            settings: self.settings,
        }
    }
}

impl<S: DocumentStore> PasteStore<S> {
    /// Bind a store client, clock, and settings.
    pub fn new(store: Arc<S>, clock: impl Clock, settings: StoreSettings) -> Self {
        Self {
            store,
            clock: Arc::new(clock),
            settings,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn settings(&self) -> StoreSettings {
        self.settings
    }

    /// Current time from the bound clock, in epoch milliseconds.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Reconnect hint fired between retries. Errors are ignored.
    fn reconnect_hook(&self) -> impl FnMut() {
        let store = Arc::clone(&self.store);
        move || {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                if let Err(err) = store.enable_network().await {
                    debug!("Reconnect hint failed: {}", err);
                }
            });
        }
    }

    /// Persist a new paste.
    ///
    /// # Arguments
    /// - `input`: Caller-validated paste fields.
    ///
    /// # Returns
    /// The store-assigned id.
    ///
    /// # Errors
    /// Returns [`PasteError::PermissionDenied`] with [`ACCESS_DENIED_MESSAGE`]
    /// when the store rejects the author, [`PasteError::Timeout`] when the
    /// write budget elapses, and the classified store error otherwise. A
    /// timed-out write may still have been applied remotely.
    pub async fn create(&self, input: NewPaste) -> Result<String, PasteError> {
        let document = input.into_document(self.clock.now_millis());
        let store = &self.store;
        let timeout = self.settings.write_timeout;

        let result = retry_operation(self.settings.retry, self.reconnect_hook(), move || {
            let document = document.clone();
            with_timeout(
                async move { store.insert(document).await.map_err(PasteError::from) },
                timeout,
                CREATE_TIMEOUT_MESSAGE,
            )
        })
        .await;

        match result {
            Ok(id) => {
                info!(paste_id = %id, "Created paste");
                Ok(id)
            }
            Err(err) => {
                warn!("Failed to create paste: {}", err);
                Err(remap_access_denied(err))
            }
        }
    }

    /// Fetch a paste by id and start its view-count increment.
    ///
    /// Expired records are returned as-is; check
    /// [`FetchedPaste::is_expired`] before showing content.
    ///
    /// # Returns
    /// `Ok(None)` when no record exists.
    ///
    /// # Errors
    /// Same classification as [`PasteStore::create`].
    pub async fn get(&self, id: &str) -> Result<Option<FetchedPaste>, PasteError> {
        let store = &self.store;
        let timeout = self.settings.read_timeout;

        let found = retry_operation(self.settings.retry, self.reconnect_hook(), move || {
            with_timeout(
                async move { store.get(id).await.map_err(PasteError::from) },
                timeout,
                GET_TIMEOUT_MESSAGE,
            )
        })
        .await
        .map_err(|err| {
            warn!(paste_id = id, "Failed to fetch paste: {}", err);
            remap_access_denied(err)
        })?;

        let Some(paste) = found else {
            debug!(paste_id = id, "Paste not found");
            return Ok(None);
        };
        let view_increment = self.spawn_view_increment(paste.id.clone());
        Ok(Some(FetchedPaste {
            paste,
            view_increment,
        }))
    }

    fn spawn_view_increment(&self, id: String) -> ViewIncrement {
        let store = Arc::clone(&self.store);
        let timeout = self.settings.write_timeout;
        let handle = tokio::spawn(async move {
            let bump = async { store.increment_views(&id).await.map_err(PasteError::from) };
            match with_timeout(bump, timeout, VIEWS_TIMEOUT_MESSAGE).await {
                Ok(()) => ViewIncrementOutcome::Succeeded,
                Err(err) => {
                    warn!(paste_id = %id, "Ignoring failed view increment: {}", err);
                    ViewIncrementOutcome::FailedIgnored
                }
            }
        });
        ViewIncrement { handle }
    }

    /// List an owner's pastes, newest first.
    ///
    /// Records without a server timestamp sort last. Failures are logged and
    /// produce an empty list.
    pub async fn list(&self, owner_id: &str) -> Vec<Paste> {
        let store = &self.store;
        let timeout = self.settings.read_timeout;

        let result = retry_operation(self.settings.retry, self.reconnect_hook(), move || {
            with_timeout(
                async move {
                    store
                        .query_by_author(owner_id)
                        .await
                        .map_err(PasteError::from)
                },
                timeout,
                LIST_TIMEOUT_MESSAGE,
            )
        })
        .await;

        match result {
            Ok(mut pastes) => {
                pastes.retain(|paste| paste.author_id == owner_id);
                sort_newest_first(&mut pastes);
                pastes
            }
            Err(err) => {
                warn!(owner_id, "Listing pastes failed, showing none: {}", err);
                Vec::new()
            }
        }
    }
}

/// Order pastes by `created_at` descending; pending stamps count as zero.
pub fn sort_newest_first(pastes: &mut [Paste]) {
    pastes.sort_by_key(|paste| std::cmp::Reverse(paste.sort_key()));
}

fn remap_access_denied(err: PasteError) -> PasteError {
    match err {
        PasteError::PermissionDenied(_) => {
            PasteError::PermissionDenied(ACCESS_DENIED_MESSAGE.to_string())
        }
        other => other,
    }
}
