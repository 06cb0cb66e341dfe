// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wifidb_store_db::PlannerOptions;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding cache copies of content references
    pub cache_dir: PathBuf,

    /// Rows kept per handle by the result cache
    pub result_cache_capacity: usize,

    /// Identifiers per `IN (...)` batch
    pub identifier_chunk_size: usize,

    /// Names per `IN (...)` batch
    pub name_chunk_size: usize,

    /// Row cap for partial-identifier fallback searches
    pub fallback_limit: u64,

    /// Rows between cancellation checks in long scans
    pub cancel_check_interval: usize,

    /// Idle reader connections kept per handle
    pub max_idle_readers: usize,

    /// Search credential and PIN columns even without their indexes
    pub allow_unindexed_secondary: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("wifidb").join("CacheDB"),
            result_cache_capacity: 1000,
            identifier_chunk_size: 100,
            name_chunk_size: 50,
            fallback_limit: 100,
            cancel_check_interval: 10_000,
            max_idle_readers: 4,
            allow_unindexed_secondary: false,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            context: format!("Failed to read config file at {}", path.display()),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("result_cache_capacity", self.result_cache_capacity),
            ("identifier_chunk_size", self.identifier_chunk_size),
            ("name_chunk_size", self.name_chunk_size),
            ("cancel_check_interval", self.cancel_check_interval),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(EngineError::config(format!("{name} must be positive")));
            }
        }
        if self.fallback_limit == 0 {
            return Err(EngineError::config("fallback_limit must be positive"));
        }
        Ok(())
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            allow_unindexed_secondary: self.allow_unindexed_secondary,
        }
    }
}
