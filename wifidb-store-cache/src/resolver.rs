// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Content references and the collaborator that reads them.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

/// An opaque reference to dataset content, such as a `file://` or
/// `content://` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentRef(String);

impl ContentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text after the last path separator, ignoring any query or fragment.
    pub fn last_segment(&self) -> &str {
        let end = self.0.find(['?', '#']).unwrap_or(self.0.len());
        let path = &self.0[..end];
        path.rsplit(['/', '\\']).next().unwrap_or(path)
    }

    /// Cache file name for this reference.
    ///
    /// The readable part comes from the last segment; the hash keeps
    /// different references with the same last segment apart.
    pub fn derived_file_name(&self) -> String {
        let segment = self.last_segment();
        let stem = match segment.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => segment,
        };
        let mut name: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .take(64)
            .collect();
        if name.trim_matches('_').is_empty() {
            name = "database".to_owned();
        }
        let digest = Sha256::digest(self.0.as_bytes());
        format!("{name}-{}.sqlite", hex::encode(&digest[..8]))
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContentRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reads the bytes behind a [`ContentRef`].
pub trait ContentResolver: Send + Sync {
    /// Open a stream over the referenced content.
    fn open(&self, reference: &ContentRef) -> io::Result<Box<dyn Read + Send>>;

    /// Last modification time in milliseconds since the epoch, if known.
    fn last_modified(&self, reference: &ContentRef) -> Option<i64>;
}

/// Resolves `file://` URIs and plain filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolver;

impl FsResolver {
    pub fn path_of(reference: &ContentRef) -> PathBuf {
        let s = reference.as_str();
        PathBuf::from(s.strip_prefix("file://").unwrap_or(s))
    }
}

impl ContentResolver for FsResolver {
    fn open(&self, reference: &ContentRef) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(Self::path_of(reference))?))
    }

    fn last_modified(&self, reference: &ContentRef) -> Option<i64> {
        let modified = std::fs::metadata(Self::path_of(reference))
            .and_then(|m| m.modified())
            .ok()?;
        let millis = modified.duration_since(UNIX_EPOCH).ok()?.as_millis();
        i64::try_from(millis).ok()
    }
}
