//! Signed-in user identity and author-name helpers.

use serde::{Deserialize, Serialize};

use crate::constants::ANONYMOUS_AUTHOR;

/// Opaque user identity produced by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl Identity {
    /// Name recorded as a paste's author.
    ///
    /// # Returns
    /// The trimmed display name, or `"Anonymous"` when it is blank.
    pub fn author_name(&self) -> &str {
        let trimmed = self.display_name.trim();
        if trimmed.is_empty() {
            ANONYMOUS_AUTHOR
        } else {
            trimmed
        }
    }
}

/// Stable user id for a display name: blake3 hex of the trimmed, lowercased
/// name, so `" Ada "` and `"ada"` sign in as the same user.
pub fn derive_user_id(display_name: &str) -> String {
    let normalized = display_name.trim().to_lowercase();
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}
