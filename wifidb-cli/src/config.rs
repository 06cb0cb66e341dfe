// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wifidb_engine::EngineConfig;

use crate::error::{CliError, Result};

/// Looked up in the working directory when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "wifidb.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    #[serde(flatten)]
    pub engine: EngineConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            context: format!("Failed to read config file at {}", path.display()),
            source,
        })?;
        let config: CliConfig = toml::from_str(&contents)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load `explicit`, else `wifidb.toml` from the working directory if it
    /// exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(&fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
