// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Test utilities for wifidb.
//!
//! Builders that write small SQLite datasets in the built-in and custom
//! layouts, with exactly the indexes a test asks for, plus proptest
//! strategies.

use std::path::{Path, PathBuf};

use proptest::prelude::*;
use rusqlite::{Connection, params};
use tempfile::TempDir;
use wifidb_utils_mac::MAX_BSSID;

pub use rusqlite::types::Value as SqlValue;

/// Scratch directory for fixture stores and cache directories.
///
/// The path is canonicalized up front (`/var` is `/private/var` on macOS), so
/// the paths the cache reports for its copies and quarantine files compare
/// equal to paths joined here.
pub struct CanonicalTempDir {
    _inner: TempDir,
    path: PathBuf,
}

impl CanonicalTempDir {
    pub fn new() -> std::io::Result<Self> {
        let inner = TempDir::new()?;
        let path = inner.path().canonicalize()?;
        Ok(Self {
            _inner: inner,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a fixture or cache entry inside the directory.
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

/// One access point in a built-in store.
#[derive(Debug, Clone, PartialEq)]
pub struct NetRecord {
    pub bssid: u64,
    pub essid: String,
    pub wifi_key: String,
    pub wps_pin: i64,
    pub location: Option<(f64, f64)>,
}

impl NetRecord {
    pub fn new(bssid: u64, essid: &str, wifi_key: &str, wps_pin: i64) -> Self {
        Self {
            bssid,
            essid: essid.to_owned(),
            wifi_key: wifi_key.to_owned(),
            wps_pin,
            location: None,
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some((latitude, longitude));
        self
    }
}

/// A handful of records used across test suites.
///
/// The first record is `00:07:26:43:97:A3` (`30706735011`); the first two
/// records share a coordinate and the last has none.
pub fn sample_records() -> Vec<NetRecord> {
    vec![
        NetRecord::new(0x0007_2643_97A3, "HomeNet", "hunter22", 12_345_670).at(55.75, 37.61),
        NetRecord::new(0x0011_2233_4455, "Cafe_50%", "espresso", 11_223_344).at(55.75, 37.61),
        NetRecord::new(0xA0B1_C2D3_E4F5, "office", "s3cr3t", 87_654_321).at(48.85, 2.35),
        NetRecord::new(0x0000_0000_0001, "tiny", "", 0),
    ]
}

/// Which of the well-known built-in indexes to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltinIndexes {
    /// `idx_geo_BSSID`, `idx_geo_latitude`, `idx_geo_longitude`
    pub geo: bool,
    /// `idx_<t>_BSSID`, `idx_<t>_ESSID`
    pub basic: bool,
    /// `idx_<t>_wifikey`, `idx_<t>_wpspin`
    pub secondary: bool,
}

impl BuiltinIndexes {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            geo: true,
            basic: true,
            secondary: true,
        }
    }
}

/// Writer for stores in the `nets`/`base` + `geo` layout.
#[derive(Debug, Clone)]
pub struct BuiltinFixture {
    table: &'static str,
    geo_table: bool,
    indexes: BuiltinIndexes,
    records: Vec<NetRecord>,
}

impl BuiltinFixture {
    pub fn nets() -> Self {
        Self {
            table: "nets",
            geo_table: true,
            indexes: BuiltinIndexes::none(),
            records: Vec::new(),
        }
    }

    pub fn base() -> Self {
        Self {
            table: "base",
            ..Self::nets()
        }
    }

    pub fn without_geo_table(mut self) -> Self {
        self.geo_table = false;
        self
    }

    pub fn indexes(mut self, indexes: BuiltinIndexes) -> Self {
        self.indexes = indexes;
        self
    }

    pub fn record(mut self, record: NetRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn records(mut self, records: impl IntoIterator<Item = NetRecord>) -> Self {
        self.records.extend(records);
        self
    }

    /// Create the file at `path` and return the path.
    pub fn write(&self, path: &Path) -> rusqlite::Result<PathBuf> {
        let mut conn = Connection::open(path)?;
        let t = self.table;
        conn.execute_batch(&format!(
            "CREATE TABLE {t} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                time TEXT,
                BSSID INTEGER DEFAULT 0,
                ESSID TEXT,
                Security INTEGER,
                WiFiKey TEXT DEFAULT '',
                WPSPIN INTEGER DEFAULT 0
            );"
        ))?;
        if self.geo_table {
            conn.execute_batch(
                "CREATE TABLE geo (BSSID INTEGER, latitude REAL, longitude REAL, quadkey INTEGER);",
            )?;
        }

        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {t} (time, BSSID, ESSID, Security, WiFiKey, WPSPIN) VALUES ('2024-01-01', ?1, ?2, 2, ?3, ?4)"
            ))?;
            let mut insert_geo = if self.geo_table {
                Some(tx.prepare("INSERT INTO geo (BSSID, latitude, longitude) VALUES (?1, ?2, ?3)")?)
            } else {
                None
            };
            for r in &self.records {
                insert.execute(params![r.bssid as i64, r.essid, r.wifi_key, r.wps_pin])?;
                if let (Some(stmt), Some((lat, lon))) = (insert_geo.as_mut(), r.location) {
                    stmt.execute(params![r.bssid as i64, lat, lon])?;
                }
            }
        }
        tx.commit()?;

        let mut ddl = String::new();
        if self.indexes.geo && self.geo_table {
            ddl.push_str(
                "CREATE INDEX idx_geo_BSSID ON geo (BSSID);
                 CREATE INDEX idx_geo_latitude ON geo (latitude);
                 CREATE INDEX idx_geo_longitude ON geo (longitude);",
            );
        }
        if self.indexes.basic {
            ddl.push_str(&format!(
                "CREATE INDEX idx_{t}_BSSID ON {t} (BSSID);
                 CREATE INDEX idx_{t}_ESSID ON {t} (ESSID);"
            ));
        }
        if self.indexes.secondary {
            ddl.push_str(&format!(
                "CREATE INDEX idx_{t}_wifikey ON {t} (WiFiKey);
                 CREATE INDEX idx_{t}_wpspin ON {t} (WPSPIN);"
            ));
        }
        conn.execute_batch(&ddl)?;
        Ok(path.to_owned())
    }
}

/// Writer for a single arbitrary table.
#[derive(Debug, Clone)]
pub struct CustomFixture {
    table: String,
    columns: Vec<(String, String)>,
    rows: Vec<Vec<SqlValue>>,
    indexes: Vec<(String, String)>,
}

impl CustomFixture {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_owned(),
            columns: Vec::new(),
            rows: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Add a column with a declared type such as `TEXT` or `REAL`.
    pub fn column(mut self, name: &str, decl: &str) -> Self {
        self.columns.push((name.to_owned(), decl.to_owned()));
        self
    }

    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    /// Add an index over a comma-separated column list.
    pub fn index(mut self, name: &str, columns: &str) -> Self {
        self.indexes.push((name.to_owned(), columns.to_owned()));
        self
    }

    pub fn write(&self, path: &Path) -> rusqlite::Result<PathBuf> {
        let mut conn = Connection::open(path)?;
        let table = quote(&self.table);
        let decls: Vec<String> = self
            .columns
            .iter()
            .map(|(name, decl)| format!("{} {decl}", quote(name)))
            .collect();
        conn.execute_batch(&format!("CREATE TABLE {table} ({});", decls.join(", ")))?;

        let tx = conn.transaction()?;
        {
            let placeholders = vec!["?"; self.columns.len()].join(", ");
            let mut insert = tx.prepare(&format!("INSERT INTO {table} VALUES ({placeholders})"))?;
            for row in &self.rows {
                insert.execute(rusqlite::params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        for (name, columns) in &self.indexes {
            conn.execute_batch(&format!("CREATE INDEX {} ON {table} ({columns});", quote(name)))?;
        }
        Ok(path.to_owned())
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Overwrite `path` with bytes SQLite will reject as "not a database".
pub fn write_garbage(path: &Path) -> std::io::Result<()> {
    std::fs::write(path, vec![0x5Au8; 8192])
}

/// Any 48-bit hardware address value.
pub fn arb_bssid() -> impl Strategy<Value = u64> {
    0..=MAX_BSSID
}

/// Access point names, including LIKE metacharacters.
pub fn arb_essid() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _%-]{1,24}"
}
