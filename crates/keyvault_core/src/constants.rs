//! Shared constants used across KeyVault crates.

use std::time::Duration;

/// Default API port for the KeyVault backend.
pub const DEFAULT_PORT: u16 = 38517;

/// Default base URL for CLI/API clients.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:38517";

/// Default maximum request body accepted by the backend.
pub const DEFAULT_MAX_PASTE_SIZE: usize = 1024 * 1024;

/// Wait budget for remote writes.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Wait budget for remote reads and queries.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Retries allowed beyond the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;

/// Fixed pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Title applied when a paste is created without one.
pub const UNTITLED_PASTE_TITLE: &str = "Untitled Paste";

/// Author name applied when the identity has no display name.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Header carrying the caller's user id on backend requests.
pub const USER_ID_HEADER: &str = "x-keyvault-uid";
