// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Read query operations for the store database.

use rusqlite::params_from_iter;
use tracing::debug;
use wifidb_utils_mac::decimal_of;

use crate::connection::StoreDb;
use crate::error::{Error, Result};
use crate::plan::Statement;
use crate::types::{GeoPoint, Row, Value};

fn read_row(row: &rusqlite::Row<'_>, names: &[String]) -> rusqlite::Result<Row> {
    let mut out = Row::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        out.insert(name.clone(), Value::from(row.get_ref(i)?));
    }
    Ok(out)
}

fn read_point(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<GeoPoint>> {
    let bssid = match Value::from(row.get_ref(0)?) {
        Value::Integer(n) => u64::try_from(n).ok(),
        Value::Text(s) => decimal_of(&s).map(|b| b.as_u64()),
        _ => None,
    };
    let latitude = Value::from(row.get_ref(1)?).as_f64();
    let longitude = Value::from(row.get_ref(2)?).as_f64();
    Ok(match (bssid, latitude, longitude) {
        (Some(bssid), Some(latitude), Some(longitude)) => Some(GeoPoint {
            bssid,
            latitude,
            longitude,
        }),
        _ => None,
    })
}

impl StoreDb {
    /// Run `stmt` and return its first row.
    ///
    /// Returns `None` if nothing matches.
    pub fn fetch_optional(&self, stmt: &Statement) -> Result<Option<Row>> {
        let mut prepared = self.conn.prepare_cached(&stmt.sql)?;
        let names: Vec<String> = prepared.column_names().into_iter().map(str::to_owned).collect();
        let mut rows = prepared.query(params_from_iter(stmt.params.iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(read_row(row, &names)?)),
            None => Ok(None),
        }
    }

    /// Run `stmt` and collect every row.
    pub fn fetch_all(&self, stmt: &Statement) -> Result<Vec<Row>> {
        self.fetch_all_cancellable(stmt, 0, || false)
    }

    /// Run `stmt`, polling `cancelled` every `check_every` rows.
    ///
    /// A raised flag aborts the scan with [`Error::Cancelled`] and drops the
    /// rows read so far. `check_every == 0` disables polling.
    pub fn fetch_all_cancellable(
        &self,
        stmt: &Statement,
        check_every: usize,
        cancelled: impl Fn() -> bool,
    ) -> Result<Vec<Row>> {
        let mut prepared = self.conn.prepare_cached(&stmt.sql)?;
        let names: Vec<String> = prepared.column_names().into_iter().map(str::to_owned).collect();
        let mut rows = prepared.query(params_from_iter(stmt.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_row(row, &names)?);
            if check_every > 0 && out.len() % check_every == 0 && cancelled() {
                debug!("Scan cancelled after {} rows", out.len());
                return Err(Error::Cancelled);
            }
        }
        Ok(out)
    }

    /// Run a `(identifier, latitude, longitude)` query.
    ///
    /// Rows whose identifier or coordinates cannot be read as numbers are
    /// skipped.
    pub fn fetch_points(
        &self,
        stmt: &Statement,
        check_every: usize,
        cancelled: impl Fn() -> bool,
    ) -> Result<Vec<GeoPoint>> {
        let mut prepared = self.conn.prepare_cached(&stmt.sql)?;
        let mut rows = prepared.query(params_from_iter(stmt.params.iter()))?;
        let mut out = Vec::new();
        let mut seen = 0usize;
        while let Some(row) = rows.next()? {
            seen += 1;
            if let Some(point) = read_point(row)? {
                out.push(point);
            }
            if check_every > 0 && seen % check_every == 0 && cancelled() {
                debug!("Point scan cancelled after {seen} rows");
                return Err(Error::Cancelled);
            }
        }
        Ok(out)
    }

    /// `EXPLAIN QUERY PLAN` details for `stmt`, one line per plan step.
    pub fn explain(&self, stmt: &Statement) -> Result<Vec<String>> {
        let sql = format!("EXPLAIN QUERY PLAN {}", stmt.sql);
        let mut prepared = self.conn.prepare(&sql)?;
        let details = prepared
            .query_map(params_from_iter(stmt.params.iter()), |row| row.get::<_, String>(3))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(details)
    }
}
