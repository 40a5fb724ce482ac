//! Engine configuration file

use crate::debounce::DebounceOptions;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::search::suggest::{DEFAULT_RECENT_WINDOW, DEFAULT_SUGGESTION_LIMIT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for the CLI host, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Trailing delay for the filter query
    pub search_debounce_ms: u64,
    pub suggestion_limit: usize,
    /// How many of the last records count as recently added
    pub recent_window: usize,
    pub history_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presets_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            recent_window: DEFAULT_RECENT_WINDOW,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            history_path: None,
            presets_path: None,
        }
    }
}

impl EngineConfig {
    pub fn debounce_options(&self) -> DebounceOptions {
        DebounceOptions::search().with_delay(Duration::from_millis(self.search_debounce_ms))
    }
}

/// Default location of the configuration file
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
    Ok(config_dir.join("pollfinder").join("config.json"))
}

/// Load the configuration from `path` (or the default location).
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Write the configuration as pretty JSON, creating parent directories
pub fn save_config(config: &EngineConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let data = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, data).context("Failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search_debounce_ms, 300);
        assert_eq!(config.suggestion_limit, 10);
        assert_eq!(config.recent_window, 10);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.debounce_options().delay, Duration::from_millis(300));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"searchDebounceMs": 150, "historyPath": "/tmp/h.json"}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search_debounce_ms, 150);
        assert_eq!(config.suggestion_limit, 10);
        assert_eq!(config.history_path, Some(PathBuf::from("/tmp/h.json")));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = EngineConfig {
            suggestion_limit: 5,
            ..EngineConfig::default()
        };
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "searchDebounceMs = 3").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
