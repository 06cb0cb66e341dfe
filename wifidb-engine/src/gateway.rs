// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Routing blocking SQLite work onto tokio's blocking pool.
//!
//! Point lookups queue on the handle's primary connection; batch scans take
//! a reader from the pool and never touch that lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use wifidb_store_db::StoreDb;

use crate::error::{EngineError, Result};
use crate::pool::ReaderPool;

pub(crate) struct ReadGateway {
    primary: Arc<Mutex<Option<StoreDb>>>,
    readers: Arc<ReaderPool>,
}

impl ReadGateway {
    pub(crate) fn new(primary: StoreDb, readers: ReaderPool) -> Self {
        Self {
            primary: Arc::new(Mutex::new(Some(primary))),
            readers: Arc::new(readers),
        }
    }

    /// Run `f` on the primary connection, after every earlier point lookup.
    pub(crate) async fn point<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreDb) -> wifidb_store_db::Result<T> + Send + 'static,
    {
        let guard = Arc::clone(&self.primary).lock_owned().await;
        tokio::task::spawn_blocking(move || match guard.as_ref() {
            Some(db) => f(db).map_err(EngineError::from),
            None => Err(EngineError::Closed),
        })
        .await?
    }

    /// Run `f` on a pooled reader connection.
    pub(crate) async fn batch<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreDb) -> wifidb_store_db::Result<T> + Send + 'static,
    {
        let readers = Arc::clone(&self.readers);
        tokio::task::spawn_blocking(move || {
            let reader = readers.acquire()?;
            f(&reader).map_err(EngineError::from)
        })
        .await?
    }

    /// Release every connection. Waits for a running point lookup to finish.
    pub(crate) async fn close(&self) {
        self.readers.close();
        let primary = self.primary.lock().await.take();
        drop(primary);
    }
}
