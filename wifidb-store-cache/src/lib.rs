// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Opening datasets that may only be reachable through a content reference.
//!
//! A dataset is either a plain file we may open directly, or an opaque
//! reference (a URI handed over by some other component) that must be
//! streamed into a local cache directory first. This crate owns that cache:
//!
//! - `<cache_dir>/<derived>.sqlite` is the copy,
//! - `<cache_dir>/<derived>.sqlite.metadata` holds the source's last-modified
//!   time the copy was taken from,
//! - corrupted copies are renamed to `<file>.corrupted.<millis>` and kept.

mod error;
mod opener;
mod quarantine;
mod resolver;

pub use error::{IoContext, OpenError, Result};
pub use opener::{CachedStoreOpener, Opened, Origin};
pub use quarantine::{QuarantineRegistry, quarantine_path};
pub use resolver::{ContentRef, ContentResolver, FsResolver};

/// Milliseconds since the Unix epoch, clamped to zero for clocks set before it.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
