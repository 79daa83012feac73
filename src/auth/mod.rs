//! auth
//!
//! Credentials for the remote provider and the OAuth authorization-code
//! exchange that produces them.
//!
//! # Components
//!
//! - [`Credential`] - Opaque bearer token with a redacting `Debug`
//! - [`CredentialSource`] - Supplies a credential per operation
//! - [`StaticCredential`] - Fixed credential (e.g. from a request session)
//! - [`StoredCredential`] - Credential persisted in a [`SecretStore`]
//! - [`OAuthClient`] - Authorization URL + code-for-token exchange
//!
//! # Security
//!
//! Tokens MUST never appear in logs, error messages, JSON outputs or
//! `Debug` output.
//!
//! # Example
//!
//! ```
//! use sorpush::auth::{Credential, CredentialSource, StaticCredential};
//!
//! # tokio_test::block_on(async {
//! let source = StaticCredential::new(Some(Credential::new("gho_example").unwrap()));
//! let cred = source.credential().await.unwrap().unwrap();
//! assert!(!format!("{:?}", cred).contains("gho_example"));
//! # });
//! ```

mod errors;
mod oauth;

pub use errors::AuthError;
pub use oauth::{OAuthClient, OAuthConfig, DEFAULT_AUTHORIZE_URL, DEFAULT_SCOPE, DEFAULT_TOKEN_URL};

use async_trait::async_trait;

use crate::secrets::SecretStore;

/// Secret store key holding the access token.
pub const TOKEN_KEY: &str = "github.token";

/// Secret store key holding the pending OAuth `state`.
pub const OAUTH_STATE_KEY: &str = "oauth.state";

/// An opaque bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is empty or contains
    /// characters that cannot appear in an HTTP header.
    pub fn new(token: impl Into<String>) -> Result<Self, AuthError> {
        let token = token.into();
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(AuthError::InvalidToken("token cannot be empty".into()));
        }
        if !token.chars().all(|c| c.is_ascii_graphic()) {
            return Err(AuthError::InvalidToken(
                "token must be printable ASCII without whitespace".into(),
            ));
        }
        Ok(Self(token))
    }

    /// The raw token, for building the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Supplies the credential for one operation.
///
/// `Ok(None)` means the caller is unauthenticated; the engine reports that
/// without making any remote call.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credential(&self) -> Result<Option<Credential>, AuthError>;
}

/// A credential fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential {
    credential: Option<Credential>,
}

impl StaticCredential {
    pub fn new(credential: Option<Credential>) -> Self {
        Self { credential }
    }

    /// No credential; every operation reports `Unauthenticated`.
    pub fn anonymous() -> Self {
        Self { credential: None }
    }
}

#[async_trait]
impl CredentialSource for StaticCredential {
    async fn credential(&self) -> Result<Option<Credential>, AuthError> {
        Ok(self.credential.clone())
    }
}

/// A credential read from a [`SecretStore`] on each request.
pub struct StoredCredential {
    store: Box<dyn SecretStore>,
}

impl StoredCredential {
    pub fn new(store: Box<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Persist a token, replacing any existing one.
    pub fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        self.store.set(TOKEN_KEY, credential.expose())?;
        Ok(())
    }

    /// Remove the stored token.
    pub fn clear(&self) -> Result<(), AuthError> {
        self.store.delete(TOKEN_KEY)?;
        Ok(())
    }
}

#[async_trait]
impl CredentialSource for StoredCredential {
    async fn credential(&self) -> Result<Option<Credential>, AuthError> {
        match self.store.get(TOKEN_KEY)? {
            Some(token) => Credential::new(token).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::FileSecretStore;
    use tempfile::TempDir;

    #[test]
    fn credential_rejects_empty() {
        assert!(matches!(
            Credential::new("   "),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn credential_rejects_header_breaking_chars() {
        assert!(Credential::new("abc\r\nX-Evil: 1").is_err());
        assert!(Credential::new("tok en").is_err());
    }

    #[test]
    fn credential_trims_surrounding_whitespace() {
        let cred = Credential::new("  gho_abc\n").unwrap();
        assert_eq!(cred.expose(), "gho_abc");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::new("gho_secret_value").unwrap();
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("gho_secret_value"));
        assert!(debug.contains("redacted"));
    }

    #[tokio::test]
    async fn anonymous_source_yields_none() {
        let source = StaticCredential::anonymous();
        assert!(source.credential().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_credential_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileSecretStore::with_path(temp.path().join("secrets.toml"));
        let source = StoredCredential::new(Box::new(store));

        assert!(source.credential().await.unwrap().is_none());

        source.save(&Credential::new("gho_stored").unwrap()).unwrap();
        let cred = source.credential().await.unwrap().unwrap();
        assert_eq!(cred.expose(), "gho_stored");

        source.clear().unwrap();
        assert!(source.credential().await.unwrap().is_none());
    }
}
