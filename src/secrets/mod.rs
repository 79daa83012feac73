//! secrets
//!
//! Persistent storage for the access token and the pending OAuth state.
//!
//! Only the file provider exists: a TOML table at
//! `~/.sorpush/secrets.toml`, written atomically with 0600 permissions on
//! Unix. Use [`create_store`] with the configured provider name.
//!
//! ```ignore
//! use sorpush::secrets::create_store;
//!
//! let store = create_store(config.secrets_provider())?;
//! store.set("github.token", token.expose())?;
//! ```

mod file_store;
mod traits;

pub use file_store::FileSecretStore;
pub use traits::{SecretError, SecretStore};

/// The default secret store provider name.
pub const DEFAULT_PROVIDER: &str = "file";

/// Create a secret store for a provider name.
///
/// # Errors
///
/// - `ProviderNotAvailable` for any provider other than `file`
/// - `ReadError` if the home directory cannot be determined
pub fn create_store(provider: &str) -> Result<Box<dyn SecretStore>, SecretError> {
    match provider {
        "file" => Ok(Box::new(FileSecretStore::new()?)),
        other => Err(SecretError::ProviderNotAvailable(format!(
            "unknown secret provider: '{}' (valid: file)",
            other
        ))),
    }
}
