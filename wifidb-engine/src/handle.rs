// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Open stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};
use wifidb_store_cache::{CachedStoreOpener, ContentRef, Origin};
use wifidb_store_db::{Classification, ColumnMap, PlannerOptions, QueryPlanner, StoreDb};

use crate::cache::ResultCache;
use crate::error::{EngineError, Result};
use crate::gateway::ReadGateway;

/// An open, read-only store and its classification.
///
/// Cheap to clone; clones refer to the same connections and caches. The
/// classification is fixed for the lifetime of the handle.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    path: PathBuf,
    origin: Origin,
    reference: Option<ContentRef>,
    classification: Classification,
    columns: Option<ColumnMap>,
    gateway: ReadGateway,
    results: ResultCache,
    opener: CachedStoreOpener,
    closed: AtomicBool,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("path", &self.inner.path)
            .field("origin", &self.inner.origin)
            .field("classification", &self.inner.classification)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

pub(crate) struct HandleParts {
    pub(crate) path: PathBuf,
    pub(crate) origin: Origin,
    pub(crate) reference: Option<ContentRef>,
    pub(crate) classification: Classification,
    pub(crate) columns: Option<ColumnMap>,
    pub(crate) gateway: ReadGateway,
    pub(crate) results: ResultCache,
    pub(crate) opener: CachedStoreOpener,
}

impl StoreHandle {
    pub(crate) fn new(parts: HandleParts) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                path: parts.path,
                origin: parts.origin,
                reference: parts.reference,
                classification: parts.classification,
                columns: parts.columns,
                gateway: parts.gateway,
                results: parts.results,
                opener: parts.opener,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// File the handle reads from.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn origin(&self) -> Origin {
        self.inner.origin
    }

    pub fn reference(&self) -> Option<&ContentRef> {
        self.inner.reference.as_ref()
    }

    pub fn classification(&self) -> &Classification {
        &self.inner.classification
    }

    /// Column map of a custom store; `None` for built-in layouts.
    pub fn columns(&self) -> Option<&ColumnMap> {
        self.inner.columns.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn results(&self) -> &ResultCache {
        &self.inner.results
    }

    pub(crate) fn planner(&self, options: PlannerOptions) -> QueryPlanner<'_> {
        QueryPlanner::new(&self.inner.classification, self.inner.columns.as_ref(), options)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    /// Close the handle. Returns `true` only for the call that closed it.
    pub(crate) async fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.gateway.close().await;
        self.inner.results.clear();
        debug!("Closed store {}", self.inner.path.display());
        true
    }

    /// Serialized point lookup on the primary connection.
    pub(crate) async fn point<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreDb) -> wifidb_store_db::Result<T> + Send + 'static,
    {
        self.ensure_open()?;
        let result = self.inner.gateway.point(f).await;
        self.check(result).await
    }

    /// Concurrent scan on a reader connection.
    pub(crate) async fn batch<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreDb) -> wifidb_store_db::Result<T> + Send + 'static,
    {
        self.ensure_open()?;
        let result = self.inner.gateway.batch(f).await;
        self.check(result).await
    }

    /// Turn a corruption error into a closed handle (and a quarantined file,
    /// when the cache owns it).
    async fn check<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Err(e) if e.is_corruption() => {
                warn!("Store {} reported corruption: {e}", self.inner.path.display());
                self.close().await;
                if self.inner.origin.is_cache_owned() {
                    let opener = self.inner.opener.clone();
                    let path = self.inner.path.clone();
                    match tokio::task::spawn_blocking(move || opener.quarantine(&path)).await? {
                        Ok(_) => {}
                        Err(e) => warn!("Failed to quarantine {}: {e}", self.inner.path.display()),
                    }
                }
                Err(EngineError::Corrupted {
                    path: self.inner.path.clone(),
                })
            }
            other => other,
        }
    }
}
