// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Reader connections for batch scans.
//!
//! A `Connection` can move between threads but cannot be shared, so scans
//! that must not queue behind point lookups get their own connections to the
//! same file. Connections are returned via RAII guards and at most
//! `max_idle` are kept around.

use std::collections::VecDeque;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};
use wifidb_store_db::{IndexLevel, OpenMode, StoreDb};

use crate::error::{EngineError, Result};

pub(crate) struct ReaderPool {
    path: PathBuf,
    mode: OpenMode,
    level: IndexLevel,
    max_idle: usize,
    idle: Mutex<VecDeque<StoreDb>>,
    active: AtomicUsize,
    closed: AtomicBool,
}

impl ReaderPool {
    pub(crate) fn new(path: PathBuf, mode: OpenMode, level: IndexLevel, max_idle: usize) -> Self {
        Self {
            path,
            mode,
            level,
            max_idle,
            idle: Mutex::new(VecDeque::new()),
            active: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn idle(&self) -> std::sync::MutexGuard<'_, VecDeque<StoreDb>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out a reader, opening a new connection when none is idle.
    ///
    /// Blocking; call from the blocking pool.
    pub(crate) fn acquire(self: &Arc<Self>) -> Result<ReaderGuard> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        let reused = self.idle().pop_front();
        let db = match reused {
            Some(db) => {
                trace!("Reusing idle reader for {}", self.path.display());
                db
            }
            None => {
                let db = StoreDb::open(&self.path, self.mode)?;
                db.tune(self.level)?;
                debug!("Opened reader for {}", self.path.display());
                db
            }
        };
        self.active.fetch_add(1, Ordering::AcqRel);
        Ok(ReaderGuard {
            db: Some(db),
            pool: Arc::clone(self),
        })
    }

    /// Drop idle readers and refuse new checkouts. Readers still in use are
    /// dropped when their guard is.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.idle().clear();
    }

    #[cfg(test)]
    pub(crate) fn idle_count(&self) -> usize {
        self.idle().len()
    }

    #[cfg(test)]
    pub(crate) fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn release(&self, db: StoreDb) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let mut idle = self.idle();
        if idle.len() < self.max_idle {
            idle.push_back(db);
        }
    }
}

/// A checked-out reader; returned to its pool on drop.
pub(crate) struct ReaderGuard {
    db: Option<StoreDb>,
    pool: Arc<ReaderPool>,
}

impl Deref for ReaderGuard {
    type Target = StoreDb;

    fn deref(&self) -> &StoreDb {
        self.db.as_ref().expect("Reader already returned")
    }
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        if let Some(db) = self.db.take() {
            self.pool.release(db);
        }
    }
}
