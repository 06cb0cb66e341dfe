// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Turning raw store rows into caller-facing rows and matching them back to
//! the caller's inputs.

use wifidb_store_db::{BSSID_COLUMN, Classification, ColumnMap, Field, Row, Value};
use wifidb_utils_mac::{Bssid, all_formats_of, candidate_decimals, clean_hex, decimal_of};

/// Result-cache key an input would be stored under, if it has one.
pub(crate) fn input_key(class: &Classification, input: &str) -> Option<String> {
    if class.is_custom() {
        let input = input.trim();
        (!input.is_empty()).then(|| input.to_owned())
    } else {
        decimal_of(input).map(|b| b.as_u64().to_string())
    }
}

/// The identifier value of a raw (not yet finished) row.
pub(crate) fn raw_identifier<'a>(columns: Option<&ColumnMap>, row: &'a Row) -> Option<&'a Value> {
    match columns {
        Some(columns) => row.get(columns.get(Field::Identifier)?),
        None => row.get(BSSID_COLUMN),
    }
}

/// Whether a stored identifier value answers `input` in any encoding.
pub(crate) fn identifier_matches(input: &str, value: &Value) -> bool {
    let candidates = candidate_decimals(input);
    match value {
        Value::Integer(n) => candidates.iter().any(|b| b.as_i64() == *n),
        Value::Text(stored) => {
            let stored = stored.trim();
            if all_formats_of(input).contains(stored) {
                return true;
            }
            let hex = clean_hex(input);
            (!hex.is_empty() && clean_hex(stored) == hex)
                || decimal_of(stored).is_some_and(|b| candidates.contains(&b))
        }
        Value::Null | Value::Real(_) => false,
    }
}

/// Rewrite a raw row for callers and compute its result-cache key.
///
/// Built-in rows get `BSSID` in display form and are keyed by the decimal
/// value; custom rows are re-keyed by logical field and keyed by the raw
/// identifier text.
pub(crate) fn finish_row(columns: Option<&ColumnMap>, row: Row) -> (Option<String>, Row) {
    match columns {
        Some(columns) => {
            let key = raw_identifier(Some(columns), &row).and_then(Value::to_text);
            (key, columns.project(&row))
        }
        None => {
            let mut row = row;
            let bssid = row
                .get(BSSID_COLUMN)
                .and_then(Value::as_i64)
                .and_then(|n| Bssid::try_from(n).ok());
            match bssid {
                Some(bssid) => {
                    row.insert(BSSID_COLUMN, Value::Text(bssid.to_string()));
                    (Some(bssid.as_u64().to_string()), row)
                }
                None => (None, row),
            }
        }
    }
}
