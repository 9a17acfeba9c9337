//! Application settings loaded from `config.toml`.
//!
//! The file is optional: every field has a default, so a fresh checkout runs against
//! `data/lettings.sqlite` with `info` logging. `DATABASE_URL` in the environment still wins
//! over the configured path (see [`crate::config::database::database_url`]).

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level structure of `config.toml`
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Where the data file lives
    #[serde(default)]
    pub database: DatabaseSettings,
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// `[database]` table
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the `SQLite` data file; created on first run
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// `[logging]` table
#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive such as `info` or `lettings_desk=debug`
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/lettings.sqlite")
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns `Error::Config` if the file cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse TOML from {}: {e}", path_ref.display()),
    })
}

/// Loads `./config.toml` when present, otherwise falls back to defaults.
///
/// # Errors
/// Returns `Error::Config` if the file exists but cannot be parsed.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = Path::new(DEFAULT_CONFIG_PATH);
    if !path.exists() {
        tracing::info!("No {} found, using default settings.", DEFAULT_CONFIG_PATH);
        return Ok(AppConfig::default());
    }
    load_config(path)
}
