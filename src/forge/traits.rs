//! forge::traits
//!
//! Content API trait definition for the remote repository provider.
//!
//! # Design
//!
//! The `ContentApi` trait is async because every operation is a network
//! round trip. Each call is a single attempt: nothing here retries, and a
//! caller that wants a retry policy re-invokes the whole engine operation.
//!
//! The credential is passed per call rather than held by the client, so
//! one client can serve requests for many users.
//!
//! # Example
//!
//! ```ignore
//! use sorpush::forge::{ContentApi, ForgeError};
//!
//! async fn exists(api: &dyn ContentApi, cred: &Credential, repo: &RepositoryRef) -> Result<bool, ForgeError> {
//!     match api.get_entry(cred, repo, "README.md", "main").await {
//!         Ok(_) => Ok(true),
//!         Err(ForgeError::NotFound(_)) => Ok(false),
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::Credential;
use crate::core::types::{BranchRef, ContentEntry, RepositoryRef};

/// Errors from content API operations.
///
/// `AuthFailed` and `RateLimited` are specific kinds of remote failure;
/// `RemoteFailure` covers every other non-2xx response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// The provider rejected the credential (invalid, expired, missing scope).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency rejection: stale sha, missing sha on an
    /// existing file, or a ref that already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// Any other non-2xx response.
    #[error("remote failure: {status} - {message}")]
    RemoteFailure {
        /// HTTP status code
        status: u16,
        /// Error message from the provider
        message: String,
    },

    /// The provider payload was missing an expected field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Transport failure or timeout.
    #[error("network error: {0}")]
    Network(String),
}

impl ForgeError {
    /// Whether re-invoking the whole operation later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ForgeError::RateLimited | ForgeError::Network(_) => true,
            ForgeError::RemoteFailure { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound(_))
    }
}

/// Request to write a file.
///
/// `sha` must be `None` for a create and the current blob sha for an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutFileRequest {
    /// Repository-relative path
    pub path: String,
    /// Commit message
    pub message: String,
    /// Raw file content (encoded by the client)
    pub content: Vec<u8>,
    /// Target branch
    pub branch: String,
    /// Current blob sha, for updates only
    pub sha: Option<String>,
}

/// Request to merge one branch into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// Branch receiving the merge
    pub base: String,
    /// Branch being merged
    pub head: String,
    /// Merge commit message
    pub commit_message: String,
}

/// Result of a merge request.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeResult {
    /// A merge commit was created; the provider body is kept verbatim.
    Merged(serde_json::Value),
    /// The base already contains the head.
    NothingToMerge,
}

/// Repository summary returned by [`ContentApi::list_repositories`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RepositorySummary {
    pub owner: String,
    pub name: String,
}

/// Remote tree-structured content store.
///
/// Implementations must be `Send + Sync` so engine futures can be spawned.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Get the provider name (e.g., "github").
    fn name(&self) -> &'static str;

    /// List the entries of a directory in the repository's default state.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the path does not exist
    async fn list_directory(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<ContentEntry>, ForgeError>;

    /// Read metadata for a single path on a branch.
    ///
    /// A directory at `path` is reported with `is_directory = true` and no sha.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the path does not exist on that branch
    async fn get_entry(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        path: &str,
        branch: &str,
    ) -> Result<ContentEntry, ForgeError>;

    /// Create or update a file. Returns the provider response verbatim.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the sha is stale, or missing for an existing file
    /// - `NotFound` if the branch does not exist
    async fn put_file(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        request: PutFileRequest,
    ) -> Result<serde_json::Value, ForgeError>;

    /// Name of the repository's default branch.
    async fn default_branch(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
    ) -> Result<String, ForgeError>;

    /// Read a branch and its head commit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn get_branch(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        name: &str,
    ) -> Result<BranchRef, ForgeError>;

    /// Create `refs/heads/{name}` pointing at `sha`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the ref already exists
    async fn create_ref(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        name: &str,
        sha: &str,
    ) -> Result<serde_json::Value, ForgeError>;

    /// Merge `head` into `base`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the merge has conflicts
    /// - `NotFound` if either branch does not exist
    async fn merge(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        request: MergeRequest,
    ) -> Result<MergeResult, ForgeError>;

    /// Names of all branches.
    async fn list_branches(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
    ) -> Result<Vec<String>, ForgeError>;

    /// Repositories the authenticated user can push to.
    async fn list_repositories(
        &self,
        cred: &Credential,
    ) -> Result<Vec<RepositorySummary>, ForgeError>;
}
