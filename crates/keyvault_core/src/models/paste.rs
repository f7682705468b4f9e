//! Paste records, creation input, and expiry helpers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{ANONYMOUS_AUTHOR, UNTITLED_PASTE_TITLE};
use crate::models::identity::Identity;

const MILLIS_PER_MINUTE: i64 = 60_000;
const MILLIS_PER_DAY: i64 = 24 * 60 * MILLIS_PER_MINUTE;

/// Rendering hint for paste content. Content is never validated against it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasteType {
    #[default]
    Text,
    Json,
    Key,
}

impl PasteType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Key => "key",
        }
    }
}

impl fmt::Display for PasteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected paste type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown paste type '{0}' (expected text, json, or key)")]
pub struct InvalidPasteType(pub String);

impl FromStr for PasteType {
    type Err = InvalidPasteType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "key" => Ok(Self::Key),
            other => Err(InvalidPasteType(other.to_string())),
        }
    }
}

/// Lifetime chosen at creation. Serialized as minutes, `-1` for never.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ExpiryDuration {
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
    #[default]
    Never,
}

/// Rejected duration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported duration {0} minutes (expected -1, 60, 1440, 10080, or 43200)")]
pub struct InvalidDuration(pub i64);

impl ExpiryDuration {
    /// Every selectable duration, shortest first.
    pub const ALL: [ExpiryDuration; 5] = [
        Self::OneHour,
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::Never,
    ];

    /// Parse the wire value.
    ///
    /// # Errors
    /// Returns [`InvalidDuration`] for anything outside the enumerated set.
    pub fn from_minutes(minutes: i64) -> Result<Self, InvalidDuration> {
        match minutes {
            60 => Ok(Self::OneHour),
            1_440 => Ok(Self::OneDay),
            10_080 => Ok(Self::OneWeek),
            43_200 => Ok(Self::OneMonth),
            -1 => Ok(Self::Never),
            other => Err(InvalidDuration(other)),
        }
    }

    /// Wire value in minutes, `-1` for [`ExpiryDuration::Never`].
    pub fn as_minutes(self) -> i64 {
        self.minutes().unwrap_or(-1)
    }

    /// Lifetime in minutes, `None` when the paste never expires.
    pub fn minutes(self) -> Option<i64> {
        match self {
            Self::OneHour => Some(60),
            Self::OneDay => Some(1_440),
            Self::OneWeek => Some(10_080),
            Self::OneMonth => Some(43_200),
            Self::Never => None,
        }
    }

    /// Human label persisted alongside the record.
    pub fn label(self) -> &'static str {
        match self {
            Self::OneHour => "1 Hour",
            Self::OneDay => "1 Day",
            Self::OneWeek => "1 Week",
            Self::OneMonth => "1 Month",
            Self::Never => "Forever",
        }
    }

    /// Expiry instant for a paste created at `created_at_millis`.
    pub fn expires_at(self, created_at_millis: i64) -> Option<i64> {
        self.minutes()
            .map(|minutes| created_at_millis.saturating_add(minutes * MILLIS_PER_MINUTE))
    }
}

impl TryFrom<i64> for ExpiryDuration {
    type Error = InvalidDuration;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_minutes(value)
    }
}

impl From<ExpiryDuration> for i64 {
    fn from(value: ExpiryDuration) -> Self {
        value.as_minutes()
    }
}

/// Server-assigned instant.
///
/// Documents leave the client as `Pending`; the store replaces the value with
/// `At(epoch_millis)` when it persists them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timestamp {
    #[default]
    Pending,
    At(i64),
}

impl Timestamp {
    pub fn millis(self) -> Option<i64> {
        match self {
            Self::Pending => None,
            Self::At(millis) => Some(millis),
        }
    }

    /// Ordering key where a pending stamp sorts as the earliest instant.
    pub fn sort_key(self) -> i64 {
        self.millis().unwrap_or(0)
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        self.millis().and_then(DateTime::from_timestamp_millis)
    }
}

/// Paste fields as written to the remote store (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteDocument {
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub is_private: bool,
    #[serde(rename = "type")]
    pub paste_type: PasteType,
    #[serde(rename = "duration_in_minutes")]
    pub duration: ExpiryDuration,
    pub duration_label: String,
    pub created_at: Timestamp,
    pub expires_at: Option<i64>,
    pub views: u64,
}

/// A stored paste as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub is_private: bool,
    #[serde(rename = "type")]
    pub paste_type: PasteType,
    #[serde(rename = "duration_in_minutes")]
    pub duration: ExpiryDuration,
    pub duration_label: String,
    pub created_at: Timestamp,
    pub expires_at: Option<i64>,
    pub views: u64,
}

/// Where a paste stands relative to its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Never,
    /// Whole days left, rounded up.
    Remaining { days: i64 },
    Expired,
}

impl Paste {
    /// Materialize a stored document under its assigned id.
    pub fn from_document(id: String, document: PasteDocument) -> Self {
        Self {
            id,
            title: document.title,
            content: document.content,
            author_id: document.author_id,
            author_name: document.author_name,
            is_private: document.is_private,
            paste_type: document.paste_type,
            duration: document.duration,
            duration_label: document.duration_label,
            created_at: document.created_at,
            expires_at: document.expires_at,
            views: document.views,
        }
    }

    /// Listing order key: `created_at` millis, `0` while pending.
    pub fn sort_key(&self) -> i64 {
        self.created_at.sort_key()
    }

    /// Consumer-side expiry check; the store itself never filters.
    ///
    /// # Returns
    /// `true` once `now_millis` has reached `expires_at`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now_millis >= expires_at)
    }

    /// Expiry summary for listings.
    pub fn expiry_status(&self, now_millis: i64) -> ExpiryStatus {
        let Some(expires_at) = self.expires_at else {
            return ExpiryStatus::Never;
        };
        let remaining = expires_at - now_millis;
        if remaining <= 0 {
            return ExpiryStatus::Expired;
        }
        ExpiryStatus::Remaining {
            days: (remaining + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY,
        }
    }
}

/// Caller input for creating a paste.
///
/// Content is validated by callers; the store accepts empty content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaste {
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub is_private: bool,
    pub paste_type: PasteType,
    pub duration: ExpiryDuration,
    pub duration_label: Option<String>,
}

impl NewPaste {
    /// Start a public, never-expiring text paste authored by `identity`.
    pub fn for_identity(identity: &Identity, content: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            content: content.into(),
            author_id: identity.id.clone(),
            author_name: identity.author_name().to_string(),
            is_private: false,
            paste_type: PasteType::Text,
            duration: ExpiryDuration::Never,
            duration_label: None,
        }
    }

    /// Build the document written to the store.
    ///
    /// # Arguments
    /// - `now_millis`: Creation instant used for `expires_at`.
    ///
    /// # Returns
    /// A document with defaults applied, `created_at` pending, and zero views.
    pub fn into_document(self, now_millis: i64) -> PasteDocument {
        let title = match self.title.trim() {
            "" => UNTITLED_PASTE_TITLE.to_string(),
            trimmed => trimmed.to_string(),
        };
        let author_name = match self.author_name.trim() {
            "" => ANONYMOUS_AUTHOR.to_string(),
            trimmed => trimmed.to_string(),
        };
        let duration_label = self
            .duration_label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| self.duration.label().to_string());

        PasteDocument {
            title,
            content: self.content,
            author_id: self.author_id,
            author_name,
            is_private: self.is_private,
            paste_type: self.paste_type,
            duration: self.duration,
            duration_label,
            created_at: Timestamp::Pending,
            expires_at: self.duration.expires_at(now_millis),
            views: 0,
        }
    }
}
