//! secrets::file_store
//!
//! TOML-file secret storage.
//!
//! The file is a flat table of string values. Every write replaces the
//! whole file through a temp file and rename, with 0600 permissions set
//! on Unix before any bytes are written.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use tracing::debug;

use super::traits::{SecretError, SecretStore};

/// Directory under the home directory holding sorpush state.
pub const STATE_DIR: &str = ".sorpush";

const SECRETS_FILE: &str = "secrets.toml";

/// File-backed [`SecretStore`].
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Store at `~/.sorpush/secrets.toml`.
    pub fn new() -> Result<Self, SecretError> {
        let home = dirs::home_dir()
            .ok_or_else(|| SecretError::ReadError("cannot determine home directory".into()))?;
        Ok(Self::with_path(home.join(STATE_DIR).join(SECRETS_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, SecretError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(SecretError::ReadError(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        // toml errors quote the offending line, which may hold a secret
        toml::from_str(&content).map_err(|_| {
            SecretError::ReadError(format!("cannot parse {}", self.path.display()))
        })
    }

    fn store(&self, secrets: &BTreeMap<String, String>) -> Result<(), SecretError> {
        let write_err = |what: &str, e: std::io::Error| {
            SecretError::WriteError(format!("{}: {}", what, e))
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err("cannot create directory", e))?;
        }
        let content = toml::to_string(secrets)
            .map_err(|e| SecretError::WriteError(format!("cannot serialize secrets: {}", e)))?;

        let temp_path = self.path.with_extension("toml.tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| write_err("cannot create temp file", e))?;
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| write_err("cannot set permissions", e))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| write_err("cannot write secrets", e))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| write_err("cannot replace secrets file", e))?;
        debug!(path = %self.path.display(), keys = secrets.len(), "secrets file written");
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.load()?;
        secrets.insert(key.to_string(), value.to_string());
        self.store(&secrets)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut secrets = self.load()?;
        if secrets.remove(key).is_none() {
            return Ok(());
        }
        self.store(&secrets)
    }
}
