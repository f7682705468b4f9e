//! Paste storage operations backed by redb.

use std::sync::Arc;

use redb::{ReadableDatabase, ReadableTable};
use uuid::Uuid;

use crate::db::tables::PASTES;
use crate::error::AppError;
use crate::models::paste::{Paste, PasteDocument, Timestamp};

/// Accessor for the paste table.
pub struct PasteDb {
    db: Arc<redb::Database>,
}

fn deserialize_paste(bytes: &[u8]) -> Result<Paste, AppError> {
    Ok(bincode::deserialize(bytes)?)
}

/// `expires_at` must be present exactly when the duration is finite, and
/// must fall after the creation instant.
fn check_expiry(document: &PasteDocument, created_at_millis: i64) -> Result<(), AppError> {
    match (document.duration.minutes(), document.expires_at) {
        (None, Some(expires_at)) => Err(AppError::BadRequest(format!(
            "expires_at {} given for a paste that never expires",
            expires_at
        ))),
        (Some(_), None) => Err(AppError::BadRequest(format!(
            "expires_at is required for a {} paste",
            document.duration.label()
        ))),
        (Some(_), Some(expires_at)) if expires_at <= created_at_millis => {
            Err(AppError::BadRequest(format!(
                "expires_at {} is not after created_at {}",
                expires_at, created_at_millis
            )))
        }
        _ => Ok(()),
    }
}

impl PasteDb {
    /// Initialize the paste table if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error when redb transaction/table initialization fails.
    pub fn new(db: Arc<redb::Database>) -> Result<Self, AppError> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(PASTES)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Insert a document under a freshly generated id.
    ///
    /// The stored row gets `created_at = At(now_millis)` and zero views
    /// whatever the document carried. `expires_at` is kept as sent.
    ///
    /// # Returns
    /// The row as stored.
    ///
    /// # Errors
    /// Returns [`AppError::BadRequest`] when `expires_at` disagrees with the
    /// duration or is not after `now_millis`, and an error when serialization
    /// or storage fails.
    pub fn insert(&self, document: PasteDocument, now_millis: i64) -> Result<Paste, AppError> {
        check_expiry(&document, now_millis)?;
        let id = Uuid::new_v4().simple().to_string();
        let mut paste = Paste::from_document(id, document);
        paste.created_at = Timestamp::At(now_millis);
        paste.views = 0;
        let encoded = bincode::serialize(&paste)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut pastes = write_txn.open_table(PASTES)?;
            if pastes.get(paste.id.as_str())?.is_some() {
                return Err(AppError::StorageMessage(format!(
                    "Paste id '{}' already exists",
                    paste.id
                )));
            }
            pastes.insert(paste.id.as_str(), encoded.as_slice())?;
        }
        write_txn.commit()?;
        Ok(paste)
    }

    /// Fetch a paste by id.
    ///
    /// # Returns
    /// `Ok(Some(paste))` when found, `Ok(None)` when missing.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn get(&self, id: &str) -> Result<Option<Paste>, AppError> {
        let read_txn = self.db.begin_read()?;
        let pastes = read_txn.open_table(PASTES)?;
        match pastes.get(id)? {
            Some(value) => Ok(Some(deserialize_paste(value.value())?)),
            None => Ok(None),
        }
    }

    /// Add one to a paste's view counter inside a single write transaction.
    ///
    /// # Returns
    /// The new count, or `None` when the paste does not exist.
    ///
    /// # Errors
    /// Returns an error when storage access or serialization fails.
    pub fn increment_views(&self, id: &str) -> Result<Option<u64>, AppError> {
        let write_txn = self.db.begin_write()?;
        let views = {
            let mut pastes = write_txn.open_table(PASTES)?;
            let existing = match pastes.get(id)? {
                Some(value) => Some(deserialize_paste(value.value())?),
                None => None,
            };
            match existing {
                Some(mut paste) => {
                    paste.views = paste.views.saturating_add(1);
                    let encoded = bincode::serialize(&paste)?;
                    pastes.insert(id, encoded.as_slice())?;
                    Some(paste.views)
                }
                None => None,
            }
        };

        if views.is_some() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(views)
    }

    /// All pastes whose `author_id` equals `author_id`, in key order.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn list_by_author(&self, author_id: &str) -> Result<Vec<Paste>, AppError> {
        let read_txn = self.db.begin_read()?;
        let pastes = read_txn.open_table(PASTES)?;
        let mut found = Vec::new();
        for entry in pastes.iter()? {
            let (_, value) = entry?;
            let paste = deserialize_paste(value.value())?;
            if paste.author_id == author_id {
                found.push(paste);
            }
        }
        Ok(found)
    }
}
