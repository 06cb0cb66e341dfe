// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpenError>;

#[derive(Error, Debug)]
pub enum OpenError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read content reference '{reference}': {source}")]
    Resolver {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] wifidb_store_db::Error),

    #[error("Database at {} is corrupted", path.display())]
    Corrupted { path: PathBuf },

    #[error("No usable source: {0}")]
    Unavailable(String),
}

impl OpenError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        OpenError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Helper trait for adding context to I/O errors
pub trait IoContext<T> {
    fn io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| OpenError::io(f(), e))
    }
}
