//! CLI settings: database location and query configuration.
//!
//! Stored at `~/.config/marquee/settings.toml`. Every field is optional;
//! a missing file means defaults throughout.

use std::path::{Path, PathBuf};

use marquee_db::QueryConfig;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) database: DatabaseSettings,
    pub(crate) query: QueryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DatabaseSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) path: Option<PathBuf>,
}

/// Canonical path to the settings file.
pub(crate) fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("marquee").join("settings.toml")
}

/// Where the library database lives when nothing else says.
pub(crate) fn default_database_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("marquee").join("library.db")
}

impl Settings {
    /// Load from the canonical path.
    pub(crate) fn load() -> Result<Self, CliError> {
        Self::load_from(&settings_path())
    }

    pub(crate) fn load_from(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))
    }

    /// Resolve the database path:
    ///
    /// 1. CLI override (if `Some`)
    /// 2. `database.path` in `settings.toml`
    /// 3. The platform data directory
    pub(crate) fn database_path(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(default_database_path)
    }

    pub(crate) fn to_toml(&self) -> Result<String, CliError> {
        toml::to_string_pretty(self).map_err(|e| CliError::config(e.to_string()))
    }
}
