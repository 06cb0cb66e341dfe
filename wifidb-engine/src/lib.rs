// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Async query engine over large read-only WiFi datasets.
//!
//! An [`Engine`] opens stores (directly or through the local cache), keeps
//! one classification per [`StoreHandle`] and answers lookups with the
//! fastest plan that classification allows.
//!
//! Point lookups on a handle are serialized on its primary connection;
//! batch scans run on separate reader connections and never wait for them.
//! All SQLite work happens on tokio's blocking pool.
//!
//! # Example
//!
//! ```ignore
//! use wifidb_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! let handle = engine.open_store(Some("file:///data/wifi.db"), None).await?;
//! if let Some(row) = engine.lookup(&handle, "00:07:26:43:97:A3").await? {
//!     println!("{}", row.get_str("WiFiKey").unwrap_or_default());
//! }
//! engine.close_store(&handle).await;
//! ```

mod cache;
mod config;
mod engine;
mod error;
mod gateway;
mod handle;
mod pool;
mod rows;

pub use cache::ResultCache;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use handle::StoreHandle;

pub use tokio_util::sync::CancellationToken;
pub use wifidb_store_cache::{ContentRef, ContentResolver, FsResolver, Origin};
pub use wifidb_store_db::{
    Bounds, Classification, ColumnMap, Field, GeoPoint, IndexLevel, Layout, Row, Value,
};
