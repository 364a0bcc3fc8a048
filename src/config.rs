//! Client Configuration
//!
//! JSON-backed settings for the engine and the HTTP client. Every field has
//! a default, so an empty object (or no file at all) is a valid config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "TASKBOARD_API_URL";

/// When the local cascade of a status toggle is applied relative to the remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusWriteOrder {
    /// Apply locally first, then issue the remote write. Failures are reported, not rolled back.
    #[default]
    Optimistic,
    /// Apply locally only after the remote write succeeded.
    Confirmed,
}

/// How rename writes are grouped by the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenameKeying {
    /// One debounce window per board
    #[default]
    PerBoard,
    /// A single window shared by all boards; the last rename wins
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rename_debounce_ms: u64,
    pub reorder_debounce_ms: u64,
    pub status_write_order: StatusWriteOrder,
    pub rename_keying: RenameKeying,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rename_debounce_ms: 500,
            reorder_debounce_ms: 1000,
            status_write_order: StatusWriteOrder::default(),
            rename_keying: RenameKeying::default(),
        }
    }
}

impl EngineConfig {
    pub fn rename_window(&self) -> Duration {
        Duration::from_millis(self.rename_debounce_ms)
    }

    pub fn reorder_window(&self) -> Duration {
        Duration::from_millis(self.reorder_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub export_dir: PathBuf,
    pub log_dir: PathBuf,
    pub token_path: PathBuf,
    pub engine: EngineConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3030/api".to_string(),
            export_dir: PathBuf::from("exports"),
            log_dir: PathBuf::from("logs"),
            token_path: PathBuf::from("auth_token"),
            engine: EngineConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> SyncResult<Self> {
        serde_json::from_str(json).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Read a config file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_json(&text)?.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.engine.rename_window(), Duration::from_millis(500));
        assert_eq!(config.engine.reorder_window(), Duration::from_secs(1));
        assert_eq!(config.engine.status_write_order, StatusWriteOrder::Optimistic);
        assert_eq!(config.engine.rename_keying, RenameKeying::PerBoard);
    }

    #[test]
    fn test_partial_engine_section() {
        let config = ClientConfig::from_json(
            r#"{"api_base_url":"https://boards.example.com/api",
                "engine":{"rename_debounce_ms":250,"status_write_order":"confirmed","rename_keying":"shared"}}"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://boards.example.com/api");
        assert_eq!(config.engine.rename_debounce_ms, 250);
        assert_eq!(config.engine.reorder_debounce_ms, 1000);
        assert_eq!(config.engine.status_write_order, StatusWriteOrder::Confirmed);
        assert_eq!(config.engine.rename_keying, RenameKeying::Shared);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ClientConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskboard.json");
        std::fs::write(&path, r#"{"export_dir":"/tmp/boards"}"#).unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.export_dir, PathBuf::from("/tmp/boards"));

        let missing = ClientConfig::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(SyncError::Config(_))));
    }
}
