// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Logical fields and the mapping onto a custom table's physical columns.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::types::Row;

/// A logical dataset field, independent of how a file names its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    #[serde(alias = "mac", alias = "bssid")]
    Identifier,
    #[serde(alias = "essid")]
    Name,
    #[serde(alias = "wifi_pass", alias = "password", alias = "key")]
    Credential,
    #[serde(alias = "wps_pin", alias = "wpspin")]
    Pin,
    #[serde(alias = "lat")]
    Latitude,
    #[serde(alias = "lon")]
    Longitude,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Identifier,
        Field::Name,
        Field::Credential,
        Field::Pin,
        Field::Latitude,
        Field::Longitude,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Identifier => "identifier",
            Field::Name => "name",
            Field::Credential => "credential",
            Field::Pin => "pin",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
        }
    }

    /// Whether free-text searches can target this field.
    pub fn is_searchable(self) -> bool {
        !matches!(self, Field::Latitude | Field::Longitude)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field '{0}'")]
pub struct UnknownFieldError(pub String);

impl FromStr for Field {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "identifier" | "mac" | "bssid" => Field::Identifier,
            "name" | "essid" => Field::Name,
            "credential" | "wifi_pass" | "password" | "key" => Field::Credential,
            "pin" | "wps_pin" | "wpspin" => Field::Pin,
            "latitude" | "lat" => Field::Latitude,
            "longitude" | "lon" => Field::Longitude,
            _ => return Err(UnknownFieldError(s.to_owned())),
        })
    }
}

/// Mapping from logical field to physical column of a custom table.
///
/// A missing entry means the field is unavailable in that file; queries on
/// it return nothing rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap(BTreeMap<Field, String>);

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: Field, column: impl Into<String>) -> Self {
        self.0.insert(field, column.into());
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, column)| (*field, column.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only mappings whose column exists in `available`, adopting the
    /// table's spelling of each column name.
    #[must_use]
    pub fn resolve_against(&self, table: &str, available: &[String]) -> Self {
        let mut resolved = ColumnMap::new();
        for (field, column) in self.iter() {
            match available.iter().find(|c| c.eq_ignore_ascii_case(column)) {
                Some(actual) => resolved = resolved.with(field, actual.clone()),
                None => warn!("Column '{column}' for {field} not found in '{table}', ignoring"),
            }
        }
        resolved
    }

    /// Re-key a physical row by logical field name, dropping unmapped columns.
    pub fn project(&self, row: &Row) -> Row {
        let mut projected = Row::with_capacity(self.len());
        for (field, column) in self.iter() {
            if let Some(value) = row.get(column) {
                projected.insert(field.as_str(), value.clone());
            }
        }
        projected
    }
}

impl FromIterator<(Field, String)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (Field, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
