//! Service configuration: cache TTL, export chunking, page size.
//! Loads from a JSON file; every field has a default so a missing file
//! falls back to `ServiceConfig::default()`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Tunables for the translation service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Path of the SQLite database file.
    pub db_path: PathBuf,
    /// How long cached listing pages and export mappings stay fresh.
    pub cache_ttl_secs: u64,
    /// Rows fetched per chunk while building the export mapping.
    pub export_chunk_size: usize,
    /// Records per listing page.
    pub page_size: usize,
    /// Interval of the background expiry sweep. 0 disables the sweep;
    /// expiry is still enforced lazily on read.
    pub sweep_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("lexbank.db"),
            cache_ttl_secs: 60,
            export_chunk_size: 10_000,
            page_size: 100,
            sweep_interval_secs: 300,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ServiceConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
