//! Remote document store seam.
//!
//! The Paste Store depends only on these primitives. The CLI talks to the
//! backend over HTTP; tests use [`memory::MemoryStore`].

/// In-process store with failure injection.
pub mod memory;

use std::future::Future;

use crate::error::StoreError;
use crate::models::paste::{Paste, PasteDocument};

/// Primitives offered by the remote collection of paste documents.
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a document under a store-generated id.
    ///
    /// The store replaces a pending `created_at` with its own clock.
    fn insert(
        &self,
        document: PasteDocument,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Fetch a document by id; `Ok(None)` when it does not exist.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Paste>, StoreError>> + Send;

    /// Atomically add one to a document's `views` field.
    fn increment_views(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All documents whose `author_id` equals `author_id`, in no particular order.
    fn query_by_author(
        &self,
        author_id: &str,
    ) -> impl Future<Output = Result<Vec<Paste>, StoreError>> + Send;

    /// Best-effort hint to re-establish connectivity.
    fn enable_network(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
