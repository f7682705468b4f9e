//! Data models for pastes and identities.

/// Signed-in user identity.
pub mod identity;
/// Paste records, creation input, and expiry helpers.
pub mod paste;
