//! core::config
//!
//! Configuration loading.
//!
//! # Locations
//!
//! The configuration file is searched in order, first hit wins:
//! 1. An explicit path (the `--config` flag)
//! 2. `$GITBRIDGE_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gitbridge/config.toml`
//! 4. `~/.gitbridge/config.toml`
//!
//! A missing file is not an error; defaults are used. An explicit path that
//! does not exist is an error.
//!
//! # Precedence
//!
//! Defaults, then the file, then CLI overrides (applied by the caller).
//! Nothing changed at runtime is written back.
//!
//! # Example
//!
//! ```no_run
//! use gitbridge::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("listening on {}", config.settings.server.bind);
//! ```

pub mod schema;

pub use schema::{RemoteSettings, RepositorySettings, ServerSettings, Settings};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GITBRIDGE_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration and where it came from.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: Settings,
    /// The file the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration, preferring `explicit` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` does not exist, or if a config file
    /// exists but cannot be read, parsed, or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        let config = match path {
            Some(path) => Config {
                settings: Self::read(&path)?,
                source: Some(path),
            },
            None => Config::default(),
        };

        config.settings.validate()?;
        Ok(config)
    }

    /// Find the first existing config file in the standard locations.
    fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitbridge/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".gitbridge/config.toml"))
            .filter(|path| path.exists())
    }

    /// Read and parse a config file.
    fn read(path: &Path) -> Result<Settings, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
