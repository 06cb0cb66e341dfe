// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Query planning.
//!
//! Every search is assembled as a [`Select`] and rendered exactly once into a
//! [`Statement`]. The shape of the query depends only on the store's
//! [`Classification`]: index hints are attached when the classification
//! proves the named index exists *and* the predicate can use it, since
//! SQLite rejects `INDEXED BY` outright when it cannot.

use tracing::{debug, warn};
use wifidb_utils_mac::{Bssid, all_formats_of, candidate_decimals, clean_hex};

use crate::columns::{ColumnMap, Field};
use crate::schema::{
    BSSID_COLUMN, Classification, ESSID_COLUMN, GEO_BSSID_INDEX, GEO_LATITUDE_INDEX, GEO_TABLE,
    IndexLevel, LATITUDE_COLUMN, LONGITUDE_COLUMN, Layout, MainTable, WIFI_KEY_COLUMN,
    WPS_PIN_COLUMN,
};
use crate::types::{Bounds, Value};

/// Rendered SQL with its positional parameters, in the order they appear.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Knobs that change which predicates the planner is willing to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Search credential and PIN columns even when they are not indexed.
    pub allow_unindexed_secondary: bool,
}

/// Quote an identifier for SQLite.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape `\`, `%` and `_` for use in a `LIKE … ESCAPE '\'` pattern.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combine {
    All,
    Any,
}

#[derive(Debug, Clone)]
struct Source {
    table: String,
    alias: Option<String>,
    indexed_by: Option<String>,
}

impl Source {
    fn new(table: String) -> Self {
        Self {
            table,
            alias: None,
            indexed_by: None,
        }
    }

    fn render(&self, sql: &mut String) {
        sql.push_str(&self.table);
        if let Some(alias) = &self.alias {
            sql.push(' ');
            sql.push_str(alias);
        }
        if let Some(index) = &self.indexed_by {
            sql.push_str(" INDEXED BY ");
            sql.push_str(index);
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    source: Source,
    on: String,
}

#[derive(Debug, Clone)]
struct Predicate {
    sql: String,
    params: Vec<Value>,
}

/// Incremental `SELECT` builder.
///
/// Table and column fragments are inserted verbatim; callers quote
/// user-supplied identifiers with [`quote_ident`].
#[derive(Debug, Clone)]
pub struct Select {
    distinct: bool,
    columns: Vec<String>,
    source: Source,
    joins: Vec<Join>,
    predicates: Vec<Predicate>,
    combine: Combine,
    order_by: Vec<String>,
    limit: Option<u64>,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            distinct: false,
            columns: Vec::new(),
            source: Source::new(table.into()),
            joins: Vec::new(),
            predicates: Vec::new(),
            combine: Combine::All,
            order_by: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.source.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn indexed_by(mut self, index: Option<&str>) -> Self {
        self.source.indexed_by = index.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn column(mut self, expr: impl Into<String>) -> Self {
        self.columns.push(expr.into());
        self
    }

    #[must_use]
    pub fn left_join(
        mut self,
        table: impl Into<String>,
        alias: impl Into<String>,
        index: Option<&str>,
        on: impl Into<String>,
    ) -> Self {
        self.joins.push(Join {
            source: Source {
                table: table.into(),
                alias: Some(alias.into()),
                indexed_by: index.map(str::to_owned),
            },
            on: on.into(),
        });
        self
    }

    /// Add a predicate; `?` placeholders in `sql` bind `params` in order.
    #[must_use]
    pub fn filter(mut self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.push_filter(sql, params);
        self
    }

    pub fn push_filter(&mut self, sql: impl Into<String>, params: Vec<Value>) {
        self.predicates.push(Predicate {
            sql: sql.into(),
            params,
        });
    }

    /// Combine predicates with `OR` instead of `AND`.
    #[must_use]
    pub fn any(mut self) -> Self {
        self.combine = Combine::Any;
        self
    }

    #[must_use]
    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order_by.push(expr.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn has_filter(&self) -> bool {
        !self.predicates.is_empty()
    }

    /// Render the SQL text and collect parameters in placeholder order.
    pub fn build(self) -> Statement {
        let mut sql = String::from("SELECT ");
        let mut params = Vec::new();
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        self.source.render(&mut sql);
        for join in &self.joins {
            sql.push_str(" LEFT JOIN ");
            join.source.render(&mut sql);
            sql.push_str(" ON ");
            sql.push_str(&join.on);
        }

        if !self.predicates.is_empty() {
            let separator = match self.combine {
                Combine::All => " AND ",
                Combine::Any => " OR ",
            };
            let wrap = self.predicates.len() > 1;
            sql.push_str(" WHERE ");
            for (i, predicate) in self.predicates.into_iter().enumerate() {
                if i > 0 {
                    sql.push_str(separator);
                }
                if wrap {
                    sql.push('(');
                }
                sql.push_str(&predicate.sql);
                if wrap {
                    sql.push(')');
                }
                params.extend(predicate.params);
            }
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        Statement { sql, params }
    }
}

fn builtin(class: &Classification) -> Option<(MainTable, bool)> {
    match class.layout {
        Layout::Builtin { table, geo_table } => Some((table, geo_table)),
        _ => None,
    }
}

/// `SELECT DISTINCT n.*, g.latitude, g.longitude FROM <t> n LEFT JOIN geo g …`
fn main_select(class: &Classification, table: MainTable, geo_table: bool, hint: Option<&str>) -> Select {
    let select = Select::from(table.name())
        .alias("n")
        .indexed_by(hint)
        .distinct()
        .column("n.*");
    if geo_table {
        let geo_hint = (class.geo >= IndexLevel::Full).then_some(GEO_BSSID_INDEX);
        select
            .column(format!("g.{LATITUDE_COLUMN}"))
            .column(format!("g.{LONGITUDE_COLUMN}"))
            .left_join(
                GEO_TABLE,
                "g",
                geo_hint,
                format!("n.{BSSID_COLUMN} = g.{BSSID_COLUMN}"),
            )
    } else {
        select
            .column(format!("NULL AS {LATITUDE_COLUMN}"))
            .column(format!("NULL AS {LONGITUDE_COLUMN}"))
    }
}

fn bssid_hint(class: &Classification, table: MainTable) -> Option<&'static str> {
    (class.point >= IndexLevel::Basic).then_some(table.bssid_index())
}

fn in_list(column: &str, values: Vec<Value>) -> (String, Vec<Value>) {
    let sql = if values.len() == 1 {
        format!("{column} = ?")
    } else {
        format!("{column} IN ({})", placeholders(values.len()))
    };
    (sql, values)
}

fn bssid_values(bssids: &[Bssid]) -> Vec<Value> {
    let mut values: Vec<Value> = Vec::with_capacity(bssids.len());
    for bssid in bssids {
        let value = Value::Integer(bssid.as_i64());
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

/// Textual match against the decimal and hex renderings of the integer key.
fn bssid_text_predicate(column: &str, text: &str, whole_word: bool) -> (String, Vec<Value>) {
    let hex = clean_hex(text);
    let (op, decimal, hex_param) = if whole_word {
        ("=", text.to_owned(), hex.clone())
    } else {
        ("LIKE", contains_pattern(text), contains_pattern(&hex))
    };
    let escape = if whole_word { "" } else { " ESCAPE '\\'" };
    let mut sql = format!("CAST({column} AS TEXT) {op} ?{escape}");
    let mut params = vec![Value::Text(decimal)];
    if !hex.is_empty() {
        sql.push_str(&format!(" OR printf('%012X', {column}) {op} ?{escape}"));
        params.push(Value::Text(hex_param));
    }
    (sql, params)
}

fn text_predicate(column: &str, text: &str, whole_word: bool) -> (String, Vec<Value>) {
    if whole_word {
        (
            format!("{column} = ? COLLATE NOCASE"),
            vec![Value::from(text)],
        )
    } else {
        (
            format!("{column} LIKE ? ESCAPE '\\'"),
            vec![Value::Text(contains_pattern(text))],
        )
    }
}

fn pin_value(text: &str) -> Value {
    match text.parse::<i64>() {
        Ok(n) => Value::Integer(n),
        Err(_) => Value::from(text),
    }
}

/// Single-row lookup by canonical identifier on a built-in store.
pub fn point_query(class: &Classification, bssid: Bssid) -> Option<Statement> {
    points_query(class, &[bssid])
}

/// Batch lookup by canonical identifiers on a built-in store.
pub fn points_query(class: &Classification, bssids: &[Bssid]) -> Option<Statement> {
    let (table, geo_table) = builtin(class)?;
    if bssids.is_empty() {
        return None;
    }
    let (sql, params) = in_list(&format!("n.{BSSID_COLUMN}"), bssid_values(bssids));
    let stmt = main_select(class, table, geo_table, bssid_hint(class, table))
        .filter(sql, params)
        .build();
    debug!("Point plan: {}", stmt.sql);
    Some(stmt)
}

/// Partial-identifier search used when the input has no canonical reading.
pub fn identifier_fallback_query(class: &Classification, text: &str, limit: u64) -> Option<Statement> {
    let (table, geo_table) = builtin(class)?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (sql, params) = bssid_text_predicate(&format!("n.{BSSID_COLUMN}"), text, false);
    Some(
        main_select(class, table, geo_table, None)
            .filter(sql, params)
            .order_by(format!("n.{BSSID_COLUMN}"))
            .limit(Some(limit))
            .build(),
    )
}

/// Free-text search over one or more fields of a built-in store.
///
/// Predicates are OR-ed. Credential and PIN columns are only searched when
/// they are indexed, unless `options` allows full scans.
pub fn field_query(
    class: &Classification,
    fields: &[Field],
    text: &str,
    whole_word: bool,
    options: PlannerOptions,
) -> Option<Statement> {
    let (table, geo_table) = builtin(class)?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let secondary = class.field >= IndexLevel::Full || options.allow_unindexed_secondary;

    let mut fields = fields.to_vec();
    fields.sort();
    fields.dedup();

    let mut predicates = Vec::new();
    let mut hint = None;
    for field in &fields {
        match field {
            Field::Identifier => {
                let column = format!("n.{BSSID_COLUMN}");
                let candidates = candidate_decimals(text);
                if candidates.is_empty() {
                    predicates.push(bssid_text_predicate(&column, text, whole_word));
                } else {
                    predicates.push(in_list(&column, bssid_values(&candidates)));
                    hint = bssid_hint(class, table);
                }
            }
            Field::Name => {
                predicates.push(text_predicate(&format!("n.{ESSID_COLUMN}"), text, whole_word));
            }
            Field::Credential if secondary => {
                predicates.push(text_predicate(
                    &format!("n.{WIFI_KEY_COLUMN}"),
                    text,
                    whole_word,
                ));
            }
            Field::Pin if secondary => {
                predicates.push((format!("n.{WPS_PIN_COLUMN} = ?"), vec![pin_value(text)]));
                if class.field >= IndexLevel::Full {
                    hint = Some(table.wps_pin_index());
                }
            }
            Field::Credential | Field::Pin => {
                warn!("Skipping {field} search on {}: column is not indexed", table.name());
            }
            Field::Latitude | Field::Longitude => {}
        }
    }

    if predicates.is_empty() {
        return None;
    }
    // A hint is only valid when its predicate is the whole WHERE clause.
    if predicates.len() > 1 {
        hint = None;
    }

    let mut select = main_select(class, table, geo_table, hint).any();
    for (sql, params) in predicates {
        select.push_filter(sql, params);
    }
    let stmt = select.build();
    debug!("Field plan: {}", stmt.sql);
    Some(stmt)
}

/// Batch exact-name lookup on a built-in store.
pub fn names_query(class: &Classification, names: &[String]) -> Option<Statement> {
    let (table, geo_table) = builtin(class)?;
    if names.is_empty() {
        return None;
    }
    let values = names.iter().map(|n| Value::from(n.as_str())).collect();
    let (sql, params) = in_list(&format!("n.{ESSID_COLUMN}"), values);
    let hint = (class.field >= IndexLevel::Basic).then_some(table.essid_index());
    Some(main_select(class, table, geo_table, hint).filter(sql, params).build())
}

fn range_filter(latitude: &str, longitude: &str) -> String {
    format!("{latitude} >= ? AND {latitude} <= ? AND {longitude} >= ? AND {longitude} <= ?")
}

fn bounds_params(bounds: &Bounds) -> Vec<Value> {
    vec![
        Value::Real(bounds.south),
        Value::Real(bounds.north),
        Value::Real(bounds.west),
        Value::Real(bounds.east),
    ]
}

/// Points inside `bounds`, read from the `geo` table only.
pub fn geo_query(class: &Classification, bounds: &Bounds, limit: Option<u64>) -> Option<Statement> {
    let (_, geo_table) = builtin(class)?;
    if !geo_table {
        return None;
    }
    let hint = (class.geo >= IndexLevel::Full).then_some(GEO_LATITUDE_INDEX);
    Some(
        Select::from(GEO_TABLE)
            .indexed_by(hint)
            .column(BSSID_COLUMN)
            .column(LATITUDE_COLUMN)
            .column(LONGITUDE_COLUMN)
            .filter(range_filter(LATITUDE_COLUMN, LONGITUDE_COLUMN), bounds_params(bounds))
            .limit(limit)
            .build(),
    )
}

fn custom_select(table: &str) -> Select {
    Select::from(quote_ident(table)).distinct()
}

/// Match one identifier input against a custom column in every encoding.
fn custom_identifier_predicate(column: &str, input: &str) -> Option<(String, Vec<Value>)> {
    let mut parts = Vec::new();
    let mut params = Vec::new();

    let formats = all_formats_of(input);
    if !formats.is_empty() {
        parts.push(format!("{column} IN ({})", placeholders(formats.len())));
        params.extend(formats.into_iter().map(Value::Text));
    }
    let hex = clean_hex(input);
    if !hex.is_empty() {
        parts.push(format!(
            "REPLACE(REPLACE(UPPER({column}), ':', ''), '-', '') = ?"
        ));
        params.push(Value::Text(hex));
    }
    for bssid in candidate_decimals(input) {
        parts.push(format!("{column} = ?"));
        params.push(Value::Integer(bssid.as_i64()));
    }

    if parts.is_empty() {
        return None;
    }
    Some((parts.join(" OR "), params))
}

/// Identifier lookup on a custom table; one predicate group per input.
pub fn custom_identifiers_query(
    table: &str,
    columns: &ColumnMap,
    inputs: &[String],
) -> Option<Statement> {
    let column = quote_ident(columns.get(Field::Identifier)?);
    let mut select = custom_select(table).any();
    for input in inputs {
        if let Some((sql, params)) = custom_identifier_predicate(&column, input) {
            select.push_filter(sql, params);
        }
    }
    select.has_filter().then(|| select.build())
}

/// Partial-identifier search on a custom table.
pub fn custom_identifier_fallback_query(
    table: &str,
    columns: &ColumnMap,
    text: &str,
    limit: u64,
) -> Option<Statement> {
    let column = quote_ident(columns.get(Field::Identifier)?);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(
        custom_select(table)
            .filter(
                format!("UPPER({column}) LIKE UPPER(?) ESCAPE '\\'"),
                vec![Value::Text(contains_pattern(text))],
            )
            .limit(Some(limit))
            .build(),
    )
}

/// Free-text search over the mapped fields of a custom table.
pub fn custom_field_query(
    table: &str,
    columns: &ColumnMap,
    fields: &[Field],
    text: &str,
    whole_word: bool,
) -> Option<Statement> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut select = custom_select(table).any();
    for field in fields.iter().filter(|f| f.is_searchable()) {
        let Some(column) = columns.get(*field) else {
            continue;
        };
        let column = quote_ident(column);
        if *field == Field::Identifier {
            if let Some((sql, params)) = custom_identifier_predicate(&column, text) {
                select.push_filter(sql, params);
            }
        } else if whole_word {
            select.push_filter(format!("UPPER({column}) = UPPER(?)"), vec![Value::from(text)]);
        } else {
            select.push_filter(
                format!("UPPER({column}) LIKE UPPER(?) ESCAPE '\\'"),
                vec![Value::Text(contains_pattern(text))],
            );
        }
    }
    select.has_filter().then(|| select.build())
}

/// Batch exact-name lookup on a custom table.
pub fn custom_names_query(table: &str, columns: &ColumnMap, names: &[String]) -> Option<Statement> {
    let column = quote_ident(columns.get(Field::Name)?);
    if names.is_empty() {
        return None;
    }
    let values = names.iter().map(|n| Value::from(n.as_str())).collect();
    let (sql, params) = in_list(&column, values);
    Some(custom_select(table).filter(sql, params).build())
}

/// Points inside `bounds` from a custom table; needs all three geo fields.
pub fn custom_geo_query(
    table: &str,
    columns: &ColumnMap,
    bounds: &Bounds,
    limit: Option<u64>,
) -> Option<Statement> {
    let identifier = quote_ident(columns.get(Field::Identifier)?);
    let latitude = quote_ident(columns.get(Field::Latitude)?);
    let longitude = quote_ident(columns.get(Field::Longitude)?);
    Some(
        Select::from(quote_ident(table))
            .column(identifier)
            .column(latitude.clone())
            .column(longitude.clone())
            .filter(range_filter(&latitude, &longitude), bounds_params(bounds))
            .limit(limit)
            .build(),
    )
}

/// Layout-aware front door over the query builders.
///
/// Returns `None` whenever the store cannot answer the query (unknown layout,
/// unmapped fields, empty input); callers treat that as an empty result.
#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner<'a> {
    class: &'a Classification,
    columns: Option<&'a ColumnMap>,
    options: PlannerOptions,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(
        class: &'a Classification,
        columns: Option<&'a ColumnMap>,
        options: PlannerOptions,
    ) -> Self {
        Self {
            class,
            columns,
            options,
        }
    }

    fn custom(&self) -> Option<(&'a str, &'a ColumnMap)> {
        match (&self.class.layout, self.columns) {
            (Layout::Custom { table }, Some(columns)) => Some((table.as_str(), columns)),
            _ => None,
        }
    }

    pub fn point(&self, bssid: Bssid) -> Option<Statement> {
        match self.custom() {
            Some((table, columns)) => custom_identifiers_query(table, columns, &[bssid.to_string()]),
            None => point_query(self.class, bssid),
        }
    }

    /// Batch identifier lookup for raw user inputs.
    pub fn identifiers(&self, inputs: &[String]) -> Option<Statement> {
        match self.custom() {
            Some((table, columns)) => custom_identifiers_query(table, columns, inputs),
            None => {
                let bssids: Vec<Bssid> = inputs.iter().flat_map(|i| candidate_decimals(i)).collect();
                points_query(self.class, &bssids)
            }
        }
    }

    pub fn identifier_fallback(&self, text: &str, limit: u64) -> Option<Statement> {
        match self.custom() {
            Some((table, columns)) => custom_identifier_fallback_query(table, columns, text, limit),
            None => identifier_fallback_query(self.class, text, limit),
        }
    }

    pub fn fields(&self, fields: &[Field], text: &str, whole_word: bool) -> Option<Statement> {
        match self.custom() {
            Some((table, columns)) => custom_field_query(table, columns, fields, text, whole_word),
            None => field_query(self.class, fields, text, whole_word, self.options),
        }
    }

    pub fn names(&self, names: &[String]) -> Option<Statement> {
        match self.custom() {
            Some((table, columns)) => custom_names_query(table, columns, names),
            None => names_query(self.class, names),
        }
    }

    pub fn geo(&self, bounds: &Bounds, limit: Option<u64>) -> Option<Statement> {
        match self.custom() {
            Some((table, columns)) => custom_geo_query(table, columns, bounds, limit),
            None => geo_query(self.class, bounds, limit),
        }
    }
}
