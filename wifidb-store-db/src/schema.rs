// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Dataset layouts and index classification.
//!
//! Files produced by different converters carry different subsets of the
//! known indexes. Classification reads the catalog once and condenses it
//! into one [`IndexLevel`] per query concern; the planner only ever looks at
//! those levels.

use std::fmt;

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};

use crate::columns::{ColumnMap, Field};
use crate::connection::StoreDb;

/// Auxiliary coordinate table of built-in layouts.
pub const GEO_TABLE: &str = "geo";

pub const BSSID_COLUMN: &str = "BSSID";
pub const ESSID_COLUMN: &str = "ESSID";
pub const WIFI_KEY_COLUMN: &str = "WiFiKey";
pub const WPS_PIN_COLUMN: &str = "WPSPIN";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

pub const GEO_BSSID_INDEX: &str = "idx_geo_BSSID";
pub const GEO_LATITUDE_INDEX: &str = "idx_geo_latitude";
pub const GEO_LONGITUDE_INDEX: &str = "idx_geo_longitude";

/// Row counts below which a custom table gains little from indexing.
const BASIC_RECOMMENDATION_ROWS: u64 = 50_000;
const FULL_RECOMMENDATION_ROWS: u64 = 500_000;

/// How well a query concern is served by the indexes present.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexLevel {
    #[default]
    None,
    Basic,
    Full,
}

impl fmt::Display for IndexLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexLevel::None => "NONE",
            IndexLevel::Basic => "BASIC",
            IndexLevel::Full => "FULL",
        })
    }
}

/// Name of the main table in a built-in layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MainTable {
    Nets,
    Base,
}

impl MainTable {
    pub fn name(self) -> &'static str {
        match self {
            MainTable::Nets => "nets",
            MainTable::Base => "base",
        }
    }

    pub fn bssid_index(self) -> &'static str {
        match self {
            MainTable::Nets => "idx_nets_BSSID",
            MainTable::Base => "idx_base_BSSID",
        }
    }

    pub fn essid_index(self) -> &'static str {
        match self {
            MainTable::Nets => "idx_nets_ESSID",
            MainTable::Base => "idx_base_ESSID",
        }
    }

    pub fn wifi_key_index(self) -> &'static str {
        match self {
            MainTable::Nets => "idx_nets_wifikey",
            MainTable::Base => "idx_base_wifikey",
        }
    }

    pub fn wps_pin_index(self) -> &'static str {
        match self {
            MainTable::Nets => "idx_nets_wpspin",
            MainTable::Base => "idx_base_wpspin",
        }
    }
}

/// Which table layout a file uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Layout {
    Builtin {
        table: MainTable,
        /// Whether the auxiliary `geo` table exists at all.
        geo_table: bool,
    },
    Custom {
        table: String,
    },
    Unknown,
}

/// Index levels of one store, computed once when it is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub geo: IndexLevel,
    pub point: IndexLevel,
    pub field: IndexLevel,
    pub layout: Layout,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            geo: IndexLevel::None,
            point: IndexLevel::None,
            field: IndexLevel::None,
            layout: Layout::Unknown,
        }
    }

    /// Name of the table rows are read from.
    pub fn main_table(&self) -> Option<&str> {
        match &self.layout {
            Layout::Builtin { table, .. } => Some(table.name()),
            Layout::Custom { table } => Some(table),
            Layout::Unknown => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.layout, Layout::Custom { .. })
    }

    /// Highest of the three levels, used to size the page cache.
    pub fn overall(&self) -> IndexLevel {
        self.geo.max(self.point).max(self.field)
    }
}

/// One index entry from `sqlite_master`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogIndex {
    pub name: String,
    pub table: String,
    /// `CREATE INDEX` text; absent for automatic indexes.
    pub sql: Option<String>,
}

impl CatalogIndex {
    /// Whether the indexed column list names `column`.
    pub fn covers(&self, column: &str) -> bool {
        let Some(sql) = &self.sql else {
            return false;
        };
        let Some(open) = sql.find('(') else {
            return false;
        };
        let column = column.to_ascii_lowercase();
        sql[open + 1..]
            .to_ascii_lowercase()
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .any(|token| token == column)
    }
}

/// Tables and indexes of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub tables: Vec<String>,
    pub indexes: Vec<CatalogIndex>,
}

impl Catalog {
    pub fn read(conn: &Connection) -> rusqlite::Result<Self> {
        let mut stmt = conn.prepare_cached(
            "SELECT type, name, tbl_name, sql FROM sqlite_master WHERE type IN ('table', 'index')",
        )?;
        let mut catalog = Catalog::default();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            let name: String = row.get(1)?;
            if kind == "table" {
                catalog.tables.push(name);
            } else {
                catalog.indexes.push(CatalogIndex {
                    name,
                    table: row.get(2)?,
                    sql: row.get(3)?,
                });
            }
        }
        Ok(catalog)
    }

    /// The catalog's spelling of `name`, matched case-insensitively.
    pub fn table(&self, name: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|t| t.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.iter().any(|i| i.name.eq_ignore_ascii_case(name))
    }

    pub fn indexes_on<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a CatalogIndex> {
        self.indexes
            .iter()
            .filter(move |i| i.table.eq_ignore_ascii_case(table))
    }
}

/// Classify a catalog against the built-in layout.
pub fn classify_catalog(catalog: &Catalog) -> Classification {
    let table = if catalog.has_table(MainTable::Nets.name()) {
        MainTable::Nets
    } else if catalog.has_table(MainTable::Base.name()) {
        MainTable::Base
    } else {
        return Classification::unknown();
    };

    let geo = if [GEO_BSSID_INDEX, GEO_LATITUDE_INDEX, GEO_LONGITUDE_INDEX]
        .iter()
        .all(|idx| catalog.has_index(idx))
    {
        IndexLevel::Full
    } else {
        IndexLevel::None
    };

    let basic = catalog.has_index(table.bssid_index()) && catalog.has_index(table.essid_index());
    let full = basic
        && catalog.has_index(table.wifi_key_index())
        && catalog.has_index(table.wps_pin_index());
    let level = if full {
        IndexLevel::Full
    } else if basic {
        IndexLevel::Basic
    } else {
        IndexLevel::None
    };

    Classification {
        geo,
        point: level,
        field: level,
        layout: Layout::Builtin {
            table,
            geo_table: catalog.has_table(GEO_TABLE),
        },
    }
}

/// Classify `table` of a custom store through its column map.
pub fn classify_custom_catalog(catalog: &Catalog, table: &str, columns: &ColumnMap) -> Classification {
    let Some(table) = catalog.table(table) else {
        return Classification::unknown();
    };
    let covered = |field: Field| {
        columns
            .get(field)
            .is_some_and(|column| catalog.indexes_on(table).any(|i| i.covers(column)))
    };

    let field = if covered(Field::Name) && covered(Field::Credential) && covered(Field::Pin) {
        IndexLevel::Full
    } else if covered(Field::Name) {
        IndexLevel::Basic
    } else {
        IndexLevel::None
    };
    let point = if !covered(Field::Identifier) {
        IndexLevel::None
    } else if field == IndexLevel::Full {
        IndexLevel::Full
    } else {
        IndexLevel::Basic
    };
    let geo = if covered(Field::Identifier) && covered(Field::Latitude) && covered(Field::Longitude) {
        IndexLevel::Full
    } else {
        IndexLevel::None
    };

    Classification {
        geo,
        point,
        field,
        layout: Layout::Custom {
            table: table.to_owned(),
        },
    }
}

/// Advisory index level for a table of `rows` rows.
pub fn recommend_for_count(rows: u64) -> IndexLevel {
    if rows < BASIC_RECOMMENDATION_ROWS {
        IndexLevel::None
    } else if rows < FULL_RECOMMENDATION_ROWS {
        IndexLevel::Basic
    } else {
        IndexLevel::Full
    }
}

impl StoreDb {
    /// Read the catalog, degrading to an empty one on error.
    pub fn catalog(&self) -> Catalog {
        match Catalog::read(&self.conn) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Failed to read catalog of {}: {e}", self.path().display());
                Catalog::default()
            }
        }
    }

    /// Classify against the built-in layout. Never fails.
    pub fn classify(&self) -> Classification {
        let class = classify_catalog(&self.catalog());
        debug!(
            "Classified {}: geo={} point={} field={}",
            self.path().display(),
            class.geo,
            class.point,
            class.field
        );
        class
    }

    /// Classify `table` as a custom layout. Never fails.
    pub fn classify_custom(&self, table: &str, columns: &ColumnMap) -> Classification {
        classify_custom_catalog(&self.catalog(), table, columns)
    }

    /// Advisory index level for `table` based on its size.
    pub fn recommend_level(&self, table: &str) -> IndexLevel {
        match self.count_rows(table) {
            Ok(rows) => recommend_for_count(rows),
            Err(e) => {
                warn!("Failed to count rows of '{table}': {e}");
                IndexLevel::Basic
            }
        }
    }
}
