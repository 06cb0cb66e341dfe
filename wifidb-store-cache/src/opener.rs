// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Opening a dataset from a direct path or through the local cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use wifidb_store_db::{OpenMode, StoreDb};

use crate::error::{IoContext, OpenError, Result};
use crate::now_millis;
use crate::quarantine::QuarantineRegistry;
use crate::resolver::{ContentRef, ContentResolver};

/// Where an opened database came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The caller's own file, opened in place
    Direct,
    /// An up-to-date copy already in the cache
    Cached,
    /// A copy made by this open
    Copied,
}

impl Origin {
    /// Whether the file lives in the cache directory (and may be quarantined).
    pub fn is_cache_owned(self) -> bool {
        !matches!(self, Origin::Direct)
    }
}

/// A successfully opened and checked database.
#[derive(Debug)]
pub struct Opened {
    pub db: StoreDb,
    pub path: PathBuf,
    pub origin: Origin,
}

/// Opens datasets, maintaining cache copies of content references.
#[derive(Clone)]
pub struct CachedStoreOpener {
    cache_dir: PathBuf,
    resolver: Arc<dyn ContentResolver>,
    registry: &'static QuarantineRegistry,
}

impl std::fmt::Debug for CachedStoreOpener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedStoreOpener")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

fn open_checked(path: &Path, mode: OpenMode) -> wifidb_store_db::Result<StoreDb> {
    let db = StoreDb::open(path, mode)?;
    db.check_readable()?;
    Ok(db)
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".metadata");
    PathBuf::from(sidecar)
}

impl CachedStoreOpener {
    pub fn new(cache_dir: impl Into<PathBuf>, resolver: Arc<dyn ContentResolver>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            resolver,
            registry: QuarantineRegistry::global(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Location of the cache copy for `reference`, whether or not it exists.
    pub fn cached_path(&self, reference: &ContentRef) -> PathBuf {
        self.cache_dir.join(reference.derived_file_name())
    }

    /// Location of the staleness sidecar for `reference`.
    pub fn metadata_path(&self, reference: &ContentRef) -> PathBuf {
        sidecar_path(&self.cached_path(reference))
    }

    /// Open a dataset.
    ///
    /// A usable `direct_path` wins. Otherwise the content reference is served
    /// from the cache, copying it first when the copy is missing or stale. A
    /// corrupted cache copy is quarantined and re-copied once.
    pub fn open(&self, reference: Option<&ContentRef>, direct_path: Option<&Path>) -> Result<Opened> {
        let mut direct_error = None;
        if let Some(path) = direct_path {
            match open_checked(path, OpenMode::ReadOnly) {
                Ok(db) => {
                    debug!("Opened {} directly", path.display());
                    return Ok(Opened {
                        db,
                        path: path.to_owned(),
                        origin: Origin::Direct,
                    });
                }
                Err(e) => {
                    warn!("Direct open of {} failed, trying content reference: {e}", path.display());
                    direct_error = Some(e);
                }
            }
        }

        match (reference, direct_error) {
            (Some(reference), _) => self.open_reference(reference),
            (None, Some(e)) => Err(e.into()),
            (None, None) => Err(OpenError::Unavailable(
                "neither a path nor a content reference was given".into(),
            )),
        }
    }

    fn open_reference(&self, reference: &ContentRef) -> Result<Opened> {
        fs::create_dir_all(&self.cache_dir)
            .io_context(|| format!("Failed to create cache directory {}", self.cache_dir.display()))?;
        let path = self.cached_path(reference);
        let token = self.resolver.last_modified(reference);

        let mut origin = if path.exists() && self.is_fresh(reference, token) {
            debug!("Cache hit for {reference} at {}", path.display());
            Origin::Cached
        } else {
            self.copy(reference, &path, token)?;
            Origin::Copied
        };

        loop {
            match open_checked(&path, OpenMode::Immutable) {
                Ok(db) => return Ok(Opened { db, path, origin }),
                Err(e) if e.is_corruption() => {
                    self.quarantine(&path)?;
                    if origin == Origin::Cached {
                        info!("Cached copy of {reference} was corrupted, copying again");
                        self.copy(reference, &path, token)?;
                        origin = Origin::Copied;
                        continue;
                    }
                    return Err(OpenError::Corrupted { path });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Whether the sidecar records exactly `token`. Unknown tokens are stale.
    fn is_fresh(&self, reference: &ContentRef, token: Option<i64>) -> bool {
        let Some(token) = token else {
            return false;
        };
        fs::read_to_string(self.metadata_path(reference))
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            == Some(token)
    }

    fn copy(&self, reference: &ContentRef, path: &Path, token: Option<i64>) -> Result<()> {
        let resolver_error = |source: io::Error| OpenError::Resolver {
            reference: reference.to_string(),
            source,
        };
        let mut reader = self.resolver.open(reference).map_err(resolver_error)?;

        let mut tmp = NamedTempFile::new_in(&self.cache_dir)
            .io_context(|| format!("Failed to create temporary file in {}", self.cache_dir.display()))?;
        let bytes = io::copy(&mut reader, tmp.as_file_mut()).map_err(resolver_error)?;
        tmp.as_file()
            .sync_all()
            .io_context(|| format!("Failed to sync copy of {reference}"))?;
        tmp.persist(path)
            .map_err(|e| OpenError::io(format!("Failed to move copy to {}", path.display()), e.error))?;

        let stamp = token.unwrap_or_else(now_millis);
        fs::write(sidecar_path(path), stamp.to_string())
            .io_context(|| format!("Failed to write metadata for {}", path.display()))?;

        info!("Copied {bytes} bytes of {reference} to {}", path.display());
        Ok(())
    }

    /// Quarantine a cache-owned file after a corruption error.
    pub fn quarantine(&self, path: &Path) -> Result<Option<PathBuf>> {
        self.registry.quarantine(path)
    }

    /// Delete the cache copy of `reference` and its sidecar.
    ///
    /// Returns whether a copy existed.
    pub fn remove(&self, reference: &ContentRef) -> Result<bool> {
        let path = self.cached_path(reference);
        let existed = match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(OpenError::io(format!("Failed to remove {}", path.display()), e)),
        };
        match fs::remove_file(sidecar_path(&path)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(OpenError::io(format!("Failed to remove metadata for {}", path.display()), e)),
        }
        if existed {
            info!("Removed cached copy {}", path.display());
        }
        Ok(existed)
    }
}
