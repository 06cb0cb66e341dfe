// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Database connection management.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::IndexLevel;

/// Database open mode.
///
/// Both modes are read-only; the store is never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Plain read-only access (for files we do not own)
    ReadOnly,
    /// Read-only with the `immutable` URI flag (for cache-owned copies that
    /// nothing else writes to)
    Immutable,
}

/// Read-only SQLite connection to one dataset file.
pub struct StoreDb {
    pub(crate) conn: Connection,
    path: PathBuf,
    mode: OpenMode,
}

impl std::fmt::Debug for StoreDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreDb")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl StoreDb {
    /// Open a dataset file.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DatabaseNotFound(path.to_owned()));
        }

        let conn = match mode {
            OpenMode::ReadOnly => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
            OpenMode::Immutable => Connection::open_with_flags(
                file_uri(path, true),
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
        }
        .map_err(|e| Error::DatabaseOpen {
            path: path.to_owned(),
            source: e,
        })?;

        debug!("Opened database at {} ({:?})", path.display(), mode);
        Ok(Self {
            conn,
            path: path.to_owned(),
            mode,
        })
    }

    /// Open another connection to the same file with the same mode.
    pub fn reopen(&self) -> Result<Self> {
        Self::open(&self.path, self.mode)
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Get raw connection (for advanced usage).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Force SQLite to read the schema.
    ///
    /// Opening is lazy, so a damaged or foreign file is only noticed once
    /// something is read. This surfaces `DatabaseCorrupt`/`NotADatabase`
    /// right away.
    pub fn check_readable(&self) -> Result<()> {
        let _count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))?;
        Ok(())
    }

    /// Size the page cache after the store has been classified.
    pub fn tune(&self, level: IndexLevel) -> Result<()> {
        let cache_size = match level {
            IndexLevel::Full => 20_000,
            IndexLevel::Basic => 15_000,
            IndexLevel::None => 5_000,
        };
        self.conn.execute_batch(&format!(
            "PRAGMA temp_store = MEMORY; PRAGMA cache_size = {cache_size};"
        ))?;
        debug!("Tuned {} for {level} (cache_size={cache_size})", self.path.display());
        Ok(())
    }

    /// Names of all tables, in catalog order.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Column names of `table`, in declaration order. Empty for unknown tables.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Number of rows in `table`.
    pub fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", crate::plan::quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Build a `file:` URI for `path`, escaping the characters SQLite's URI parser
/// gives meaning to.
fn file_uri(path: &Path, immutable: bool) -> String {
    let mut uri = String::from("file:");
    for c in path.to_string_lossy().chars() {
        match c {
            '%' => uri.push_str("%25"),
            '?' => uri.push_str("%3f"),
            '#' => uri.push_str("%23"),
            c => uri.push(c),
        }
    }
    if immutable {
        uri.push_str("?immutable=1");
    }
    uri
}
