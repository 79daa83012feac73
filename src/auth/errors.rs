//! auth::errors
//!
//! Authentication error types.
//!
//! # Design
//!
//! Error messages MUST NOT contain tokens, client secrets or
//! authorization codes.
//!
//! # Example
//!
//! ```
//! use sorpush::auth::AuthError;
//!
//! let err = AuthError::NotAuthenticated;
//! assert!(err.to_string().contains("sorpush auth"));
//! ```

use thiserror::Error;

use crate::secrets::SecretError;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential is stored or supplied.
    #[error("not authenticated. Run 'sorpush auth url' or 'sorpush auth token'.")]
    NotAuthenticated,

    /// The token cannot be used as a bearer credential.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The OAuth `state` did not match the one issued.
    #[error("invalid state parameter")]
    InvalidState,

    /// Required OAuth configuration is missing.
    #[error("oauth not configured: {0}")]
    NotConfigured(String),

    /// The token endpoint returned an OAuth error payload.
    #[error("oauth error: {error}{}", describe(.description))]
    OAuth {
        /// Error code (e.g. `bad_verification_code`)
        error: String,
        /// Human-readable description
        description: Option<String>,
    },

    /// The token endpoint answered with something we cannot use.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// Network error during authentication.
    #[error("network error: {0}")]
    Network(String),

    /// Error from secret storage.
    #[error("secret store error: {0}")]
    SecretStore(String),
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

impl AuthError {
    /// Check if this error can be resolved by authenticating again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::InvalidState | AuthError::OAuth { .. }
        )
    }
}

impl From<SecretError> for AuthError {
    fn from(err: SecretError) -> Self {
        AuthError::SecretStore(err.to_string())
    }
}
