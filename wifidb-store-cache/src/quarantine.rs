// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Moving corrupted cache files out of the way.
//!
//! Several handles may hit the same damaged file at once; the registry makes
//! sure only one of them renames it and the rest see a no-op.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::{debug, warn};

use crate::error::{IoContext, Result};
use crate::now_millis;

/// `<file>.corrupted.<millis>` next to `path`.
pub fn quarantine_path(path: &Path, millis: i64) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".corrupted.{millis}"));
    path.with_file_name(name)
}

/// Set of paths currently being quarantined.
#[derive(Debug, Default)]
pub struct QuarantineRegistry {
    in_progress: Mutex<HashSet<PathBuf>>,
}

/// Removes its path from the registry when dropped.
struct Claim<'a> {
    registry: &'a QuarantineRegistry,
    path: PathBuf,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.path);
    }
}

impl QuarantineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static QuarantineRegistry {
        static GLOBAL: OnceLock<QuarantineRegistry> = OnceLock::new();
        GLOBAL.get_or_init(QuarantineRegistry::new)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.in_progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, path: &Path) -> Option<Claim<'_>> {
        if self.lock().insert(path.to_owned()) {
            Some(Claim {
                registry: self,
                path: path.to_owned(),
            })
        } else {
            None
        }
    }

    pub fn is_in_progress(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// Rename `path` (and drop its staleness sidecar) so the next open starts
    /// from a fresh copy.
    ///
    /// Returns the quarantine location, or `None` when another caller is
    /// already handling this path or the file is already gone.
    pub fn quarantine(&self, path: &Path) -> Result<Option<PathBuf>> {
        let Some(_claim) = self.claim(path) else {
            debug!("Quarantine of {} already in progress", path.display());
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }

        let target = quarantine_path(path, now_millis());
        std::fs::rename(path, &target)
            .io_context(|| format!("Failed to quarantine {}", path.display()))?;

        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(".metadata");
        let sidecar = PathBuf::from(sidecar);
        if sidecar.exists()
            && let Err(e) = std::fs::remove_file(&sidecar)
        {
            warn!("Failed to remove {}: {e}", sidecar.display());
        }

        warn!(
            "Quarantined corrupted database {} as {}",
            path.display(),
            target.display()
        );
        Ok(Some(target))
    }
}
