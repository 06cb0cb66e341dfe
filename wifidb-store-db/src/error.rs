// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Error types for store database operations.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Result type for store database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during store database operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to open database with context
    #[error("Failed to open database at '{path}': {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Database file not found
    #[error("Database not found at: {0}")]
    DatabaseNotFound(PathBuf),

    /// A scan stopped because its cancellation flag was raised
    #[error("Query cancelled")]
    Cancelled,
}

impl Error {
    /// Whether SQLite reported the file as damaged or not a database at all.
    pub fn is_corruption(&self) -> bool {
        match self {
            Error::Sqlite(e) | Error::DatabaseOpen { source: e, .. } => is_corruption_error(e),
            Error::DatabaseNotFound(_) | Error::Cancelled => false,
        }
    }
}

/// Whether a raw SQLite error signals a corrupted file.
pub fn is_corruption_error(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase)
    )
}
