//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Values are validated after parsing (see [`Settings::validate`]) so a
//! typo in the file fails at startup rather than on the first request.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, RemoteConfig};

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Origin entry that admits every browser origin.
pub const ANY_ORIGIN: &str = "*";

/// Branch used when a request does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Number of commits returned by a history query without a limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Message used for commits whose message is empty.
pub const DEFAULT_COMMIT_MESSAGE: &str = "✅ 기본 커밋 메시지";

/// Host that credential remotes point at.
pub const DEFAULT_REMOTE_HOST: &str = "github.com";

/// The whole configuration file.
///
/// # Example
///
/// ```toml
/// [server]
/// bind = "0.0.0.0:8000"
///
/// [repository]
/// path = "/home/me/todo-repo"
/// default_branch = "main"
/// history_limit = 20
///
/// [remote]
/// host = "github.com"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub repository: RepositorySettings,
    pub remote: RemoteSettings,
}

impl Settings {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        self.server.validate_origins()?;

        BranchName::new(self.repository.default_branch.as_str()).map_err(|e| {
            ConfigError::InvalidValue(format!("repository.default_branch: {}", e))
        })?;

        if self.repository.history_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "repository.history_limit must be greater than zero".into(),
            ));
        }

        RemoteConfig::with_credentials(&self.remote.host, "user", "repo", "token")
            .map_err(|e| ConfigError::InvalidValue(format!("remote.host: {}", e)))?;

        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Address to listen on
    pub bind: String,

    /// Browser origins allowed to call the API; `"*"` allows any
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            cors_allowed_origins: vec![ANY_ORIGIN.to_string()],
        }
    }
}

impl ServerSettings {
    /// Parse [`ServerSettings::bind`].
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("server.bind '{}': {}", self.bind, e)))
    }

    /// Whether `"*"` is among the allowed origins.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == ANY_ORIGIN)
    }

    /// Every origin must be `"*"` or a `scheme://host[:port]` origin.
    fn validate_origins(&self) -> Result<(), ConfigError> {
        for origin in &self.cors_allowed_origins {
            if origin == ANY_ORIGIN {
                continue;
            }
            let invalid = |why: &str| {
                ConfigError::InvalidValue(format!(
                    "server.cors_allowed_origins '{}': {}",
                    origin, why
                ))
            };
            let url = url::Url::parse(origin).map_err(|e| invalid(&e.to_string()))?;
            let parsed = url.origin();
            if !parsed.is_tuple() || parsed.ascii_serialization() != *origin {
                return Err(invalid("expected scheme://host[:port] with no path"));
            }
        }
        Ok(())
    }
}

/// Repository session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySettings {
    /// Repository opened at startup, if any
    pub path: Option<PathBuf>,

    /// Branch used when a request omits one
    pub default_branch: String,

    /// Commits returned by a history query without an explicit limit
    pub history_limit: usize,

    /// Message for commits submitted without one
    pub commit_message: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            path: None,
            default_branch: DEFAULT_BRANCH.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

/// Remote settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSettings {
    /// Host name credential remotes point at
    pub host: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_REMOTE_HOST.to_string(),
        }
    }
}
