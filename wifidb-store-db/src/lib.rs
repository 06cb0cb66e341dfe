// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Read-only SQLite access for offline WiFi datasets.
//!
//! This crate opens dataset files, classifies which indexes they carry and
//! builds the fastest safe query for a search against that classification.
//!
//! **Architecture**: this is the database layer; caching of content references
//! lives in `wifidb-store-cache` and the concurrent, async facade in
//! `wifidb-engine`.
//!
//! # Supported layouts
//!
//! - Built-in: a main table named `nets` or `base` plus an auxiliary
//!   `geo(BSSID, latitude, longitude)` table.
//! - Custom: any single table addressed through a [`ColumnMap`].
//!
//! # Example
//!
//! ```ignore
//! use wifidb_store_db::{OpenMode, QueryPlanner, StoreDb};
//!
//! let db = StoreDb::open("/data/wifi.sqlite", OpenMode::ReadOnly)?;
//! let class = db.classify();
//! let planner = QueryPlanner::new(&class, None, Default::default());
//! if let Some(stmt) = planner.point("00:07:26:43:97:A3".parse()?) {
//!     let row = db.fetch_optional(&stmt)?;
//! }
//! ```

mod columns;
mod connection;
mod error;
mod plan;
mod query;
mod schema;
mod types;

pub use columns::{ColumnMap, Field, UnknownFieldError};
pub use connection::{OpenMode, StoreDb};
pub use error::{Error, Result, is_corruption_error};
pub use plan::{PlannerOptions, QueryPlanner, Select, Statement, escape_like, quote_ident};
pub use schema::*;
pub use types::*;
