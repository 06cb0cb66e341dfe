// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wifidb_engine::{ColumnMap, Field};

/// Query large read-only WiFi access-point datasets
#[derive(Parser, Debug)]
#[command(name = "wifidb", version)]
pub struct Args {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "WIFIDB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Content reference of the dataset (e.g. file:///data/wifi.db); opened through the cache
    #[arg(long, short = 'r', global = true)]
    pub reference: Option<String>,

    /// Dataset file opened in place; tried before the content reference
    #[arg(long, global = true)]
    pub direct_path: Option<PathBuf>,

    /// Read a custom layout from this table instead of nets/base
    #[arg(long, global = true)]
    pub table: Option<String>,

    /// Column mapping for --table, e.g. identifier=mac (repeatable)
    #[arg(long = "column", value_name = "FIELD=COLUMN", global = true, value_parser = parse_column)]
    pub columns: Vec<(Field, String)>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the store's index levels and the advisory level for its size
    Classify,

    /// Look up access points by identifier, in any encoding
    Lookup {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Free-text search over one or more fields
    Search {
        #[arg(required = true)]
        query: Vec<String>,

        /// Field to search (repeatable)
        #[arg(long = "field", default_value = "name")]
        fields: Vec<Field>,

        /// Match whole values instead of substrings
        #[arg(long)]
        whole_word: bool,

        /// Treat each query word as an exact network name
        #[arg(long, conflicts_with_all = ["fields", "whole_word"])]
        names: bool,
    },

    /// Located access points inside a bounding box (inclusive)
    Bbox {
        #[arg(allow_negative_numbers = true)]
        south: f64,
        #[arg(allow_negative_numbers = true)]
        north: f64,
        #[arg(allow_negative_numbers = true)]
        west: f64,
        #[arg(allow_negative_numbers = true)]
        east: f64,

        #[arg(long)]
        limit: Option<u64>,
    },

    /// List tables, or the columns of one table
    Tables {
        table: Option<String>,
    },

    /// Delete the cache copy of --reference
    Purge,
}

impl Args {
    pub fn column_map(&self) -> ColumnMap {
        self.columns.iter().cloned().collect()
    }
}

fn parse_column(text: &str) -> Result<(Field, String), String> {
    let (field, column) = text
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=COLUMN, got '{text}'"))?;
    let field: Field = field.trim().parse().map_err(|e| format!("{e}"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("empty column name for {field}"));
    }
    Ok((field, column.to_string()))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[rstest]
    #[case("identifier=mac", Field::Identifier, "mac")]
    #[case("name = ssid ", Field::Name, "ssid")]
    #[case("credential=WiFi Key", Field::Credential, "WiFi Key")]
    fn test_parse_column(#[case] text: &str, #[case] field: Field, #[case] column: &str) {
        assert_eq!(parse_column(text), Ok((field, column.to_string())));
    }

    #[rstest]
    #[case("identifier")]
    #[case("identifier=")]
    #[case("colour=mac")]
    fn test_parse_column_rejects(#[case] text: &str) {
        assert!(parse_column(text).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "wifidb",
            "lookup",
            "00:07:26:43:97:A3",
            "--direct-path",
            "/data/wifi.db",
            "--table",
            "aps",
            "--column",
            "identifier=mac",
        ])
        .unwrap();
        assert_eq!(args.direct_path, Some(PathBuf::from("/data/wifi.db")));
        assert_eq!(args.table.as_deref(), Some("aps"));
        assert_eq!(args.column_map().get(Field::Identifier), Some("mac"));
        assert!(matches!(args.command, Command::Lookup { ref identifiers } if identifiers.len() == 1));
    }

    #[test]
    fn test_negative_coordinates() {
        let args = Args::try_parse_from(["wifidb", "bbox", "-34.0", "-33.0", "18.0", "19.0"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Bbox { south, east, limit: None, .. } if south == -34.0 && east == 19.0
        ));
    }
}
