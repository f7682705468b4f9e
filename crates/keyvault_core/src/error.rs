//! Error types for the remote store seam, the Paste Store, identity, and the
//! backend database.
use std::fmt;

use thiserror::Error;

/// Failure categories reported by a remote document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    Unavailable,
    PermissionDenied,
    NotFound,
    InvalidArgument,
    PayloadTooLarge,
    Internal,
    Unknown,
}

impl StoreErrorCode {
    /// Wire representation used in backend error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::PermissionDenied => "permission-denied",
            Self::NotFound => "not-found",
            Self::InvalidArgument => "invalid-argument",
            Self::PayloadTooLarge => "payload-too-large",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a wire code; unrecognized codes map to [`StoreErrorCode::Unknown`].
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "unavailable" => Self::Unavailable,
            "permission-denied" => Self::PermissionDenied,
            "not-found" => Self::NotFound,
            "invalid-argument" => Self::InvalidArgument,
            "payload-too-large" => Self::PayloadTooLarge,
            "internal" => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call against the remote document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a connectivity failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Unavailable, message)
    }

    /// Shorthand for a rejected access.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::PermissionDenied, message)
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        self.code == StoreErrorCode::Unavailable || message_looks_transient(&self.message)
    }
}

/// Returns `true` when a failure message mentions connectivity loss.
pub fn message_looks_transient(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    lowered.contains("offline") || lowered.contains("network")
}

/// Errors surfaced by Paste Store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasteError {
    #[error("{message}")]
    Timeout { message: String },

    #[error("Store unavailable: {0}")]
    Transient(StoreError),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Store error: {0}")]
    Unknown(StoreError),
}

impl PasteError {
    /// Retry classification used by [`crate::resilience::retry_operation`].
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Timeout { message } => message_looks_transient(message),
            Self::PermissionDenied(_) | Self::Unknown(_) => false,
        }
    }
}

impl From<StoreError> for PasteError {
    fn from(value: StoreError) -> Self {
        if value.code == StoreErrorCode::PermissionDenied {
            return Self::PermissionDenied(value.message);
        }
        if value.is_transient() {
            Self::Transient(value)
        } else {
            Self::Unknown(value)
        }
    }
}

/// Sign-in failures after provider error codes have been bucketed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error(
        "Sign-in is not authorized for origin '{origin}'. Add it to the identity provider's authorized domains."
    )]
    UnauthorizedOrigin { origin: String },

    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("Login failed: {0}")]
    LoginFailed(String),
}

/// Backend database and domain errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Storage error: {0}")]
    StorageMessage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<redb::DatabaseError> for AppError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TransactionError> for AppError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TableError> for AppError {
    fn from(value: redb::TableError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::StorageError> for AppError {
    fn from(value: redb::StorageError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::CommitError> for AppError {
    fn from(value: redb::CommitError) -> Self {
        Self::Database(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_codes_round_trip_through_wire_strings() {
        for code in [
            StoreErrorCode::Unavailable,
            StoreErrorCode::PermissionDenied,
            StoreErrorCode::NotFound,
            StoreErrorCode::InvalidArgument,
            StoreErrorCode::PayloadTooLarge,
            StoreErrorCode::Internal,
        ] {
            assert_eq!(StoreErrorCode::from_code(code.as_str()), code);
        }
        assert_eq!(
            StoreErrorCode::from_code("resource-exhausted"),
            StoreErrorCode::Unknown
        );
    }

    #[test]
    fn store_error_classification_matrix() {
        let cases = [
            (StoreError::unavailable("backend restarting"), true),
            (
                StoreError::new(StoreErrorCode::Internal, "client is offline"),
                true,
            ),
            (
                StoreError::new(StoreErrorCode::Unknown, "Network request failed"),
                true,
            ),
            (StoreError::permission_denied("missing rights"), false),
            (StoreError::new(StoreErrorCode::Internal, "disk full"), false),
        ];
        for (error, expected) in cases {
            assert_eq!(error.is_transient(), expected, "error: {}", error);
        }
    }

    #[test]
    fn paste_error_from_store_error_buckets_by_code_and_message() {
        assert!(matches!(
            PasteError::from(StoreError::permission_denied("nope")),
            PasteError::PermissionDenied(message) if message == "nope"
        ));
        assert!(matches!(
            PasteError::from(StoreError::unavailable("down")),
            PasteError::Transient(_)
        ));
        assert!(matches!(
            PasteError::from(StoreError::new(StoreErrorCode::Internal, "boom")),
            PasteError::Unknown(_)
        ));
    }

    #[test]
    fn timeouts_are_transient_only_when_message_mentions_connectivity() {
        let plain = PasteError::Timeout {
            message: "Timed out creating paste".to_string(),
        };
        let network = PasteError::Timeout {
            message: "network timeout".to_string(),
        };
        assert!(!plain.is_transient());
        assert!(network.is_transient());
        assert!(!PasteError::PermissionDenied("ACCESS DENIED".to_string()).is_transient());
    }
}
