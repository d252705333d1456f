//! Error types for telemetra-store.

use std::path::PathBuf;

/// Result type for telemetra-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in telemetra-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading not found in database.
    #[error("Reading not found: {0}")]
    ReadingNotFound(i64),

    /// Reading payload failed validation.
    #[error("Invalid reading: {0}")]
    InvalidReading(#[from] telemetra_types::InvalidReading),
}

impl Error {
    /// Whether this error is a missing-row lookup failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ReadingNotFound(_))
    }
}
