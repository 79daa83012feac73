//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first match wins:
//! 1. An explicit path (the `--config` flag)
//! 2. `$SORPUSH_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/sorpush/config.toml`
//! 4. `~/.sorpush/config.toml`
//!
//! Missing files are not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use sorpush::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("API: {}", config.api_base());
//! println!("Timeout: {:?}", config.timeout());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, OAuthSettings, SecretsConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::auth::OAuthConfig;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default `X-Client-Id` header value.
pub const DEFAULT_CLIENT_ID: &str = "sorpush";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable that may carry the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "SORPUSH_OAUTH_CLIENT_SECRET";

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

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing config value: {0}")]
    Missing(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist; the standard locations are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };

        let global = Self::read_config(&path)?;
        global.validate()?;
        Ok(Self {
            global,
            loaded_from: Some(path),
        })
    }

    /// Build a config from an in-memory value (validated).
    pub fn from_global(global: GlobalConfig) -> Result<Self, ConfigError> {
        global.validate()?;
        Ok(Self {
            global,
            loaded_from: None,
        })
    }

    fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SORPUSH_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("sorpush/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        let path = dirs::home_dir()?.join(".sorpush/config.toml");
        path.exists().then_some(path)
    }

    fn read_config(path: &Path) -> Result<GlobalConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// REST API base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.global
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    /// Value for the `X-Client-Id` header.
    pub fn client_id(&self) -> &str {
        self.global
            .client_id
            .as_deref()
            .unwrap_or(DEFAULT_CLIENT_ID)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.global.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Secrets provider name. Defaults to "file".
    pub fn secrets_provider(&self) -> &str {
        self.global
            .secrets
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or("file")
    }

    /// Build the OAuth client configuration.
    ///
    /// The client secret falls back to `$SORPUSH_OAUTH_CLIENT_SECRET`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `oauth.client_id` is not set.
    pub fn oauth(&self) -> Result<OAuthConfig, ConfigError> {
        let settings = self.global.oauth.clone().unwrap_or_default();
        let client_id = settings
            .client_id
            .ok_or_else(|| ConfigError::Missing("oauth.client_id".to_string()))?;

        let mut config = OAuthConfig::new(client_id);
        config.client_secret = settings
            .client_secret
            .or_else(|| std::env::var(CLIENT_SECRET_ENV).ok());
        config.redirect_uri = settings.redirect_uri;
        if let Some(url) = settings.authorize_url {
            config.authorize_url = url;
        }
        if let Some(url) = settings.token_url {
            config.token_url = url;
        }
        if let Some(scope) = settings.scope {
            config.scope = scope;
        }
        config.correlation_client_id = self.client_id().to_string();
        config.timeout = self.timeout();
        Ok(config)
    }

    /// Path of the file this config was loaded from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}
