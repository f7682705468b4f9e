//! Database layer for the backend document store.

/// Paste storage helpers.
pub mod paste;
/// Table definitions.
pub mod tables;

use std::path::Path;
use std::sync::Arc;

use crate::error::AppError;

/// Database handle with access to the paste table.
pub struct Database {
    pub db: Arc<redb::Database>,
    pub pastes: paste::PasteDb,
}

impl Database {
    /// Open (or create) the database stored under `path`.
    ///
    /// `path` is a directory; the redb file lives inside it as
    /// [`tables::REDB_FILE_NAME`].
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created or redb fails to
    /// open or initialize its tables.
    pub fn new(path: &str) -> Result<Self, AppError> {
        let dir = Path::new(path);
        std::fs::create_dir_all(dir).map_err(|err| {
            AppError::StorageMessage(format!(
                "Failed to create database directory '{}': {}",
                dir.display(),
                err
            ))
        })?;

        let file = dir.join(tables::REDB_FILE_NAME);
        let db = Arc::new(redb::Database::create(&file)?);
        let pastes = paste::PasteDb::new(db.clone())?;
        tracing::info!("Opened database at {}", file.display());

        Ok(Self { db, pastes })
    }
}

#[cfg(test)]
mod tests;
