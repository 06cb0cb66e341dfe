// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use thiserror::Error;
use wifidb_store_cache::OpenError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to open store: {0}")]
    Open(#[from] OpenError),

    #[error("Store at {} has no recognizable layout", path.display())]
    SchemaUnrecognized { path: PathBuf },

    #[error("Store database error: {0}")]
    Store(wifidb_store_db::Error),

    #[error("Database at {} is corrupted", path.display())]
    Corrupted { path: PathBuf },

    #[error("Store handle is closed")]
    Closed,

    #[error("Query cancelled")]
    Cancelled,

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the underlying SQLite error reports a damaged file.
    pub fn is_corruption(&self) -> bool {
        match self {
            EngineError::Store(e) => e.is_corruption(),
            EngineError::Corrupted { .. } | EngineError::Open(OpenError::Corrupted { .. }) => true,
            _ => false,
        }
    }
}

impl From<wifidb_store_db::Error> for EngineError {
    fn from(e: wifidb_store_db::Error) -> Self {
        match e {
            wifidb_store_db::Error::Cancelled => EngineError::Cancelled,
            e => EngineError::Store(e),
        }
    }
}
