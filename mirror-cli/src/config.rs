//! Settings resolution for usermirror.
//!
//! Command-line flags win over the configuration file, which wins over
//! built-in defaults.

use anyhow::{Context, Result};
use mirror_client::Config;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "usermirror.toml";
const DATABASE_FILE: &str = "users.db";

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Loaded (or default) configuration.
    pub config: Config,
    /// Database path after applying `--database`.
    pub database: PathBuf,
}

impl Settings {
    /// Resolve settings from the optional `--config` and `--database` flags.
    ///
    /// An explicit config file must exist; the default one is optional.
    pub fn resolve(config_path: Option<&Path>, database: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::from_file(path)?,
            None => match default_data_dir().map(|dir| dir.join(CONFIG_FILE)) {
                Some(path) if path.exists() => Config::from_file(&path)?,
                _ => Config::default(),
            },
        };

        let database = match database.or_else(|| config.store.database.clone()) {
            Some(path) => path,
            None => default_data_dir()
                .context("Could not determine home directory; pass --database")?
                .join(DATABASE_FILE),
        };

        Ok(Self { config, database })
    }
}

/// Get the default data directory for usermirror.
fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "usermirror", "usermirror")
        .map(|dirs| dirs.data_dir().to_path_buf())
}
