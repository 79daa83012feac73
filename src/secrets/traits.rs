//! secrets::traits
//!
//! Key-value interface for persisted secrets.
//!
//! Keys are dotted names (`github.token`, `oauth.state`). Values are opaque
//! and MUST NOT be logged or echoed into error messages.

use thiserror::Error;

/// Errors from secret storage operations.
///
/// Messages describe the storage failure only, never the value.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read secret: {0}")]
    ReadError(String),

    #[error("failed to write secret: {0}")]
    WriteError(String),

    /// Provider name not recognized.
    #[error("secret provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// A store for secrets.
///
/// Implementations must be `Send + Sync` so credential sources built on
/// them can be shared across tasks.
pub trait SecretStore: Send + Sync {
    /// `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Insert or replace.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Remove a key. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    fn exists(&self, key: &str) -> Result<bool, SecretError> {
        Ok(self.get(key)?.is_some())
    }
}
