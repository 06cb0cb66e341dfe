// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Per-handle cache of looked-up rows.
//!
//! Stores are read-only, so entries never go stale while the handle is open.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use wifidb_store_db::Row;

/// Strict LRU cache keyed by canonical identifier.
pub struct ResultCache {
    inner: Mutex<LruCache<String, Row>>,
}

impl ResultCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Row>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a row and mark it most recently used.
    pub fn get(&self, key: &str) -> Option<Row> {
        self.lock().get(key).cloned()
    }

    /// Insert a row, evicting the least recently used one when full.
    pub fn put(&self, key: impl Into<String>, row: Row) {
        self.lock().put(key.into(), row);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
