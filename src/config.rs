//! Persistent settings
//!
//! Stored as JSON in ~/.config/deepweave/config.json. A missing file means
//! defaults; unknown fields are ignored and missing fields take defaults.

use crate::ops::ReclaimedPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default log filter when nothing else is configured
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// User settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How copies treat back-references to reclaimed nodes
    pub reclaimed_policy: ReclaimedPolicy,
    /// Seed used by random commands when none is given; wall clock otherwise
    pub default_seed: Option<String>,
    /// `tracing` filter directive, e.g. "deepweave=debug"
    pub log_filter: Option<String>,
}

impl Config {
    /// The effective log filter
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// Config store - manages persistence
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create store using default path (~/.config/deepweave/config.json)
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".into()))?
            .join("deepweave");

        Ok(Self {
            path: config_dir.join("config.json"),
        })
    }

    /// Create store at an explicit path
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file is absent
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Write settings, creating the parent directory if needed
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"));
        let config = store.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("nested").join("config.json"));
        let config = Config {
            reclaimed_policy: ReclaimedPolicy::PassThrough,
            default_seed: Some("abc".into()),
            log_filter: Some("deepweave=debug".into()),
        };

        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"reclaimed_policy": "pass_through"}"#).unwrap();

        let config = ConfigStore::at(&path).load().unwrap();
        assert_eq!(config.reclaimed_policy, ReclaimedPolicy::PassThrough);
        assert_eq!(config.default_seed, None);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(ConfigStore::at(&path).load(), Err(Error::Config(_))));
    }
}
