//! Configuration loading for usermirror.
//!
//! Configuration is loaded from a TOML file. Every section and field is
//! optional; anything left out takes its default.

use mirror_core::{OffsetAdvance, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for usermirror.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Local store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Remote directory configuration.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Pagination configuration.
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Local store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file. Unset means the platform data
    /// directory chosen by the binary.
    pub database: Option<PathBuf>,
}

/// Remote directory configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL; users are read from `{base_url}/users`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Pagination configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Records per page (default: 20).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// How the offset moves after a page: `page-size` or `returned`.
    #[serde(default)]
    pub offset_advance: OffsetAdvance,
}

// Default value functions
fn default_base_url() -> String {
    "https://jsonplaceholder.typicode.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            offset_advance: OffsetAdvance::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
