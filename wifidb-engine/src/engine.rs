// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! The public, async face of the query engine.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wifidb_store_cache::{CachedStoreOpener, ContentRef, ContentResolver, FsResolver, Opened};
use wifidb_store_db::{
    Bounds, Classification, ColumnMap, Field, GeoPoint, IndexLevel, Layout, OpenMode, Row,
};
use wifidb_utils_mac::candidate_decimals;

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::gateway::ReadGateway;
use crate::handle::{HandleParts, StoreHandle};
use crate::pool::ReaderPool;
use crate::rows::{finish_row, identifier_matches, input_key, raw_identifier};

/// Entry point: opens stores and answers queries against them.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    opener: CachedStoreOpener,
}

enum Target {
    Builtin,
    Custom { table: String, columns: ColumnMap },
}

impl Engine {
    /// Engine resolving content references from the local filesystem.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_resolver(config, Arc::new(FsResolver))
    }

    pub fn with_resolver(config: EngineConfig, resolver: Arc<dyn ContentResolver>) -> Result<Self> {
        config.validate()?;
        let opener = CachedStoreOpener::new(config.cache_dir.clone(), resolver);
        Ok(Self {
            config: Arc::new(config),
            opener,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Where the cache copy of `reference` lives (or would live).
    pub fn cached_path(&self, reference: &str) -> PathBuf {
        self.opener.cached_path(&ContentRef::new(reference))
    }

    /// Open a store in the built-in `nets`/`base` + `geo` layout.
    ///
    /// `direct_path` is tried first; `reference` is served through the cache.
    pub async fn open_store(
        &self,
        reference: Option<&str>,
        direct_path: Option<&Path>,
    ) -> Result<StoreHandle> {
        self.open_with(reference, direct_path, Target::Builtin).await
    }

    /// Open a store whose single `table` is addressed through `columns`.
    ///
    /// Mappings naming columns missing from the table are dropped.
    pub async fn attach_custom_store(
        &self,
        reference: Option<&str>,
        direct_path: Option<&Path>,
        table: &str,
        columns: ColumnMap,
    ) -> Result<StoreHandle> {
        let target = Target::Custom {
            table: table.to_owned(),
            columns,
        };
        self.open_with(reference, direct_path, target).await
    }

    async fn open_with(
        &self,
        reference: Option<&str>,
        direct_path: Option<&Path>,
        target: Target,
    ) -> Result<StoreHandle> {
        let reference = reference.map(ContentRef::new);
        let direct_path = direct_path.map(Path::to_owned);
        let opener = self.opener.clone();

        let (opened, classification, columns) = tokio::task::spawn_blocking({
            let reference = reference.clone();
            move || -> Result<(Opened, Classification, Option<ColumnMap>)> {
                let opened = opener.open(reference.as_ref(), direct_path.as_deref())?;
                let (classification, columns) = match target {
                    Target::Builtin => (opened.db.classify(), None),
                    Target::Custom { table, columns } => {
                        let available = opened.db.column_names(&table)?;
                        let columns = columns.resolve_against(&table, &available);
                        (opened.db.classify_custom(&table, &columns), Some(columns))
                    }
                };
                if classification.layout == Layout::Unknown {
                    return Err(EngineError::SchemaUnrecognized {
                        path: opened.path.clone(),
                    });
                }
                opened.db.tune(classification.overall())?;
                Ok((opened, classification, columns))
            }
        })
        .await??;

        info!(
            "Opened {} ({:?}): geo={} point={} field={}",
            opened.path.display(),
            opened.origin,
            classification.geo,
            classification.point,
            classification.field
        );

        let mode = if opened.origin.is_cache_owned() {
            OpenMode::Immutable
        } else {
            OpenMode::ReadOnly
        };
        let readers = ReaderPool::new(
            opened.path.clone(),
            mode,
            classification.overall(),
            self.config.max_idle_readers,
        );
        let capacity = NonZeroUsize::new(self.config.result_cache_capacity)
            .ok_or_else(|| EngineError::config("result_cache_capacity must be positive"))?;

        Ok(StoreHandle::new(HandleParts {
            path: opened.path,
            origin: opened.origin,
            reference,
            classification,
            columns,
            gateway: ReadGateway::new(opened.db, readers),
            results: ResultCache::new(capacity),
            opener: self.opener.clone(),
        }))
    }

    /// Look up one access point by identifier in any encoding.
    ///
    /// Served from the handle's result cache when possible; otherwise
    /// serialized with other point lookups on the primary connection. Input
    /// that matches no row exactly is retried as a partial identifier and
    /// answered with the first match.
    pub async fn lookup(&self, handle: &StoreHandle, identifier: &str) -> Result<Option<Row>> {
        handle.ensure_open()?;
        let class = handle.classification();
        let key = input_key(class, identifier);
        if let Some(row) = key.as_deref().and_then(|k| handle.results().get(k)) {
            debug!("Result cache hit for {identifier}");
            return Ok(Some(row));
        }

        let planner = handle.planner(self.config.planner_options());
        let stmt = if class.is_custom() {
            planner.identifiers(&[identifier.trim().to_owned()])
        } else {
            wifidb_utils_mac::decimal_of(identifier).and_then(|bssid| planner.point(bssid))
        };

        if let Some(stmt) = stmt
            && let Some(row) = handle.point(move |db| db.fetch_optional(&stmt)).await?
        {
            let (row_key, row) = finish_row(handle.columns(), row);
            if let Some(row_key) = row_key {
                handle.results().put(row_key, row.clone());
            }
            return Ok(Some(row));
        }

        // Partial matches are not cached: the row is not keyed by this input.
        let rows = self.identifier_fallback(handle, identifier, 1).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| finish_row(handle.columns(), row).1))
    }

    /// Bounded contains-match on the identifier column.
    async fn identifier_fallback(
        &self,
        handle: &StoreHandle,
        input: &str,
        limit: u64,
    ) -> Result<Vec<Row>> {
        let Some(stmt) = handle
            .planner(self.config.planner_options())
            .identifier_fallback(input, limit)
        else {
            return Ok(Vec::new());
        };
        debug!("No exact match for '{input}', trying partial identifier search");
        handle.batch(move |db| db.fetch_all(&stmt)).await
    }

    /// Resolve many identifiers at once, keyed by the caller's input.
    ///
    /// Inputs are answered from the result cache, then by batched equality
    /// queries, then (for inputs still unmatched) by a bounded partial-match
    /// search. Inputs that match nothing are absent.
    pub async fn search_by_identifiers(
        &self,
        handle: &StoreHandle,
        inputs: &[String],
    ) -> Result<BTreeMap<String, Row>> {
        handle.ensure_open()?;
        let class = handle.classification();
        let mut found = BTreeMap::new();
        let mut pending = Vec::new();

        let unique: BTreeSet<&String> = inputs.iter().collect();
        for input in unique {
            match input_key(class, input).and_then(|k| handle.results().get(&k)) {
                Some(row) => {
                    found.insert(input.clone(), row);
                }
                None => pending.push(input.clone()),
            }
        }
        if !found.is_empty() {
            debug!("Result cache answered {} of {} identifiers", found.len(), inputs.len());
        }

        for chunk in pending.chunks(self.config.identifier_chunk_size) {
            let Some(stmt) = handle
                .planner(self.config.planner_options())
                .identifiers(chunk)
            else {
                continue;
            };
            let rows = handle.batch(move |db| db.fetch_all(&stmt)).await?;
            for row in rows {
                let Some(value) = raw_identifier(handle.columns(), &row).cloned() else {
                    continue;
                };
                let matched: Vec<&String> = chunk
                    .iter()
                    .filter(|input| !found.contains_key(*input) && identifier_matches(input, &value))
                    .collect();
                if matched.is_empty() {
                    continue;
                }
                let (key, row) = finish_row(handle.columns(), row);
                if let Some(key) = key {
                    handle.results().put(key, row.clone());
                }
                for input in matched {
                    found.insert(input.clone(), row.clone());
                }
            }
        }

        let unresolved: Vec<String> = pending
            .into_iter()
            .filter(|input| !found.contains_key(input))
            .collect();
        for input in unresolved {
            let rows = self
                .identifier_fallback(handle, &input, self.config.fallback_limit)
                .await?;
            if let Some(row) = rows.into_iter().next() {
                let (_, row) = finish_row(handle.columns(), row);
                found.insert(input, row);
            }
        }

        Ok(found)
    }

    /// Free-text search on one field.
    pub async fn search_by_field(
        &self,
        handle: &StoreHandle,
        field: Field,
        query: &str,
        whole_word: bool,
    ) -> Result<Vec<Row>> {
        self.search_by_fields(handle, &[field], query, whole_word).await
    }

    /// Free-text search on several fields; a row matching any of them is
    /// returned once.
    pub async fn search_by_fields(
        &self,
        handle: &StoreHandle,
        fields: &[Field],
        query: &str,
        whole_word: bool,
    ) -> Result<Vec<Row>> {
        handle.ensure_open()?;
        let Some(stmt) = handle
            .planner(self.config.planner_options())
            .fields(fields, query, whole_word)
        else {
            return Ok(Vec::new());
        };
        let mut rows = handle.batch(move |db| db.fetch_all(&stmt)).await?;

        // Equality on the canonical readings found nothing; the text may
        // still be part of an identifier.
        let exact_identifier =
            handle.classification().is_custom() || !candidate_decimals(query).is_empty();
        if rows.is_empty() && !whole_word && exact_identifier && fields.contains(&Field::Identifier)
        {
            rows = self
                .identifier_fallback(handle, query, self.config.fallback_limit)
                .await?;
        }
        Ok(self.finish_all(handle, rows))
    }

    /// Exact name lookup for many names, batched.
    pub async fn search_by_names(&self, handle: &StoreHandle, names: &[String]) -> Result<Vec<Row>> {
        handle.ensure_open()?;
        let mut out = Vec::new();
        for chunk in names.chunks(self.config.name_chunk_size) {
            let Some(stmt) = handle.planner(self.config.planner_options()).names(chunk) else {
                continue;
            };
            let rows = handle.batch(move |db| db.fetch_all(&stmt)).await?;
            out.extend(self.finish_all(handle, rows));
        }
        Ok(out)
    }

    fn finish_all(&self, handle: &StoreHandle, rows: Vec<Row>) -> Vec<Row> {
        rows.into_iter()
            .map(|row| finish_row(handle.columns(), row).1)
            .collect()
    }

    /// Located access points inside `bounds` (inclusive).
    ///
    /// The scan polls `cancel` every `cancel_check_interval` rows; a
    /// cancelled scan returns [`EngineError::Cancelled`] and no points.
    pub async fn points_in_bounding_box(
        &self,
        handle: &StoreHandle,
        bounds: Bounds,
        limit: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<Vec<GeoPoint>> {
        handle.ensure_open()?;
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let Some(stmt) = handle
            .planner(self.config.planner_options())
            .geo(&bounds, limit)
        else {
            return Ok(Vec::new());
        };
        let interval = self.config.cancel_check_interval;
        let cancel = cancel.clone();
        handle
            .batch(move |db| db.fetch_points(&stmt, interval, || cancel.is_cancelled()))
            .await
    }

    /// Index levels computed when the handle was opened.
    pub fn classify(&self, handle: &StoreHandle) -> Classification {
        handle.classification().clone()
    }

    /// Advisory index level for the handle's main table, by row count.
    pub async fn recommend_index_level(&self, handle: &StoreHandle) -> Result<IndexLevel> {
        handle.ensure_open()?;
        let Some(table) = handle.classification().main_table().map(str::to_owned) else {
            return Ok(IndexLevel::Basic);
        };
        handle.batch(move |db| Ok(db.recommend_level(&table))).await
    }

    /// Table names of the store.
    pub async fn tables(&self, handle: &StoreHandle) -> Result<Vec<String>> {
        handle.ensure_open()?;
        handle.batch(|db| db.table_names()).await
    }

    /// Column names of `table`; empty for unknown tables.
    pub async fn columns(&self, handle: &StoreHandle, table: &str) -> Result<Vec<String>> {
        handle.ensure_open()?;
        let table = table.to_owned();
        handle.batch(move |db| db.column_names(&table)).await
    }

    /// Close a handle. Returns `true` on the first close only.
    pub async fn close_store(&self, handle: &StoreHandle) -> bool {
        handle.close().await
    }

    /// Delete the cache copy of `reference`. Returns whether one existed.
    pub async fn remove_cached(&self, reference: &str) -> Result<bool> {
        let opener = self.opener.clone();
        let reference = ContentRef::new(reference);
        Ok(tokio::task::spawn_blocking(move || opener.remove(&reference)).await??)
    }
}
