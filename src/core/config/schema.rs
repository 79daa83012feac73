//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing: URLs must be http(s),
//! the timeout must be positive and the secrets provider must exist.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration.
///
/// # Example
///
/// ```toml
/// api_base = "https://github.example.com/api/v3"
/// client_id = "batch-portal"
/// timeout_secs = 20
///
/// [oauth]
/// client_id = "Iv1.0123456789abcdef"
/// redirect_uri = "http://localhost:8080/callback"
///
/// [secrets]
/// provider = "file"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// REST API base URL (GitHub Enterprise uses `https://host/api/v3`)
    pub api_base: Option<String>,

    /// Value sent in the `X-Client-Id` correlation header
    pub client_id: Option<String>,

    /// Per-request transport timeout in seconds
    pub timeout_secs: Option<u64>,

    /// OAuth application settings
    pub oauth: Option<OAuthSettings>,

    /// Secret storage settings
    pub secrets: Option<SecretsConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.api_base {
            validate_url("api_base", base)?;
        }

        if let Some(client_id) = &self.client_id {
            if client_id.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "client_id cannot be empty".to_string(),
                ));
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        if let Some(oauth) = &self.oauth {
            oauth.validate()?;
        }

        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }

        Ok(())
    }
}

/// OAuth application settings.
///
/// Only `client_id` is required to build an authorization URL; the
/// secret is needed for the code exchange and may also come from
/// `$SORPUSH_OAUTH_CLIENT_SECRET`.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub scope: Option<String>,
}

// Custom Debug to avoid exposing client_secret
impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .finish()
    }
}

impl OAuthSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("oauth.redirect_uri", &self.redirect_uri),
            ("oauth.authorize_url", &self.authorize_url),
            ("oauth.token_url", &self.token_url),
        ] {
            if let Some(url) = value {
                validate_url(field, url)?;
            }
        }
        Ok(())
    }
}

/// Secret storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider name
    pub provider: Option<String>,
}

impl SecretsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            if provider != "file" {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be: file",
                    provider
                )));
            }
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::InvalidValue(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        ))),
        Err(e) => Err(ConfigError::InvalidValue(format!(
            "{} is not a valid URL: {}",
            field, e
        ))),
    }
}
