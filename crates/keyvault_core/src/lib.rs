//! Core domain library for KeyVault (models, resilience, paste store, identity).

/// Clock abstraction used for expiry math and server timestamps.
pub mod clock;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Document database used by the backend service.
pub mod db;
/// Error types for the store, resilience wrappers, and identity flow.
pub mod error;
/// Identity provider seam and session adapter.
pub mod identity;
/// License-key generation helpers.
pub mod keygen;
/// Shareable paste links.
pub mod links;
/// Data models for pastes and identities.
pub mod models;
/// Paste Store: create, fetch, and list over a remote document store.
pub mod paste_store;
/// Timeout and retry wrappers for remote calls.
pub mod resilience;
/// Remote document store seam and the in-memory implementation.
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, Config};
pub use constants::{DEFAULT_PORT, DEFAULT_SERVER_URL};
pub use db::Database;
pub use error::{AppError, IdentityError, PasteError, StoreError, StoreErrorCode};
pub use identity::{IdentityAdapter, IdentityProvider, Session};
pub use models::identity::{derive_user_id, Identity};
pub use models::paste::{ExpiryDuration, NewPaste, Paste, PasteDocument, PasteType, Timestamp};
pub use paste_store::{FetchedPaste, PasteStore, StoreSettings, ViewIncrementOutcome};
pub use store::DocumentStore;
