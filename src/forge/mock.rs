//! forge::mock
//!
//! In-memory [`ContentApi`] for deterministic testing.
//!
//! # Design
//!
//! The mock keeps a file map per branch and enforces the same optimistic
//! concurrency rules as the real provider: updating an existing file
//! requires its current sha, and a stale or missing sha is a `Conflict`.
//! Blob shas are content hashes, so writing identical bytes yields the
//! same sha. Every call is recorded for later verification.
//!
//! # Example
//!
//! ```
//! use sorpush::auth::Credential;
//! use sorpush::core::types::RepositoryRef;
//! use sorpush::forge::mock::MockForge;
//! use sorpush::forge::ContentApi;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_file("main", "src/batch/sor1/sql/orders.sql", "select 1");
//! let cred = Credential::new("token").unwrap();
//! let repo = RepositoryRef::new("octocat", "feeds").unwrap();
//!
//! let listing = forge.list_directory(&cred, &repo, "src/batch/sor1").await.unwrap();
//! assert_eq!(listing[0].name, "sql");
//! assert!(listing[0].is_directory);
//! # });
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::traits::{
    ContentApi, ForgeError, MergeRequest, MergeResult, PutFileRequest, RepositorySummary,
};
use crate::auth::Credential;
use crate::core::types::{BranchRef, ContentEntry, RepositoryRef};

/// Branch created by [`MockForge::new`].
pub const MOCK_DEFAULT_BRANCH: &str = "main";

/// Mock content API for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug)]
struct MockForgeInner {
    default_branch: String,
    branches: BTreeMap<String, MockBranch>,
    /// Directories that exist even without files below them.
    directories: BTreeSet<String>,
    repositories: Vec<RepositorySummary>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
    commit_counter: u64,
}

#[derive(Debug, Clone, Default)]
struct MockBranch {
    head: String,
    files: BTreeMap<String, Vec<u8>>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    ListDirectory(ForgeError),
    GetEntry(ForgeError),
    PutFile(ForgeError),
    DefaultBranch(ForgeError),
    GetBranch(ForgeError),
    CreateRef(ForgeError),
    Merge(ForgeError),
    ListBranches(ForgeError),
    ListRepositories(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ListDirectory {
        path: String,
    },
    GetEntry {
        path: String,
        branch: String,
    },
    PutFile {
        path: String,
        branch: String,
        sha: Option<String>,
        content: Vec<u8>,
    },
    DefaultBranch,
    GetBranch {
        name: String,
    },
    CreateRef {
        name: String,
        sha: String,
    },
    Merge {
        base: String,
        head: String,
    },
    ListBranches,
    ListRepositories,
}

/// Content-addressed blob sha used by the mock.
pub fn blob_sha(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn is_below(path: &str, dir: &str) -> bool {
    dir.is_empty() || path.strip_prefix(dir).map(|rest| rest.starts_with('/')).unwrap_or(false)
}

impl MockForge {
    /// Create a mock with an empty default branch named `main`.
    pub fn new() -> Self {
        let mut inner = MockForgeInner {
            default_branch: MOCK_DEFAULT_BRANCH.to_string(),
            branches: BTreeMap::new(),
            directories: BTreeSet::new(),
            repositories: Vec::new(),
            fail_on: None,
            operations: Vec::new(),
            commit_counter: 0,
        };
        let head = inner.next_commit(MOCK_DEFAULT_BRANCH);
        inner.branches.insert(
            MOCK_DEFAULT_BRANCH.to_string(),
            MockBranch {
                head,
                files: BTreeMap::new(),
            },
        );
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a file, creating the branch if needed.
    pub fn with_file(self, branch: &str, path: &str, content: impl AsRef<[u8]>) -> Self {
        {
            let mut inner = self.state();
            inner.ensure_branch(branch);
            if let Some(b) = inner.branches.get_mut(branch) {
                b.files.insert(normalize(path), content.as_ref().to_vec());
            }
        }
        self
    }

    /// Seed an empty branch.
    pub fn with_branch(self, name: &str) -> Self {
        self.state().ensure_branch(name);
        self
    }

    /// Seed a directory that has no files below it.
    pub fn with_directory(self, path: &str) -> Self {
        self.state().directories.insert(normalize(path));
        self
    }

    /// Change the default branch, creating it if needed.
    pub fn with_default_branch(self, name: &str) -> Self {
        {
            let mut inner = self.state();
            inner.ensure_branch(name);
            inner.default_branch = name.to_string();
        }
        self
    }

    /// Add a repository to the `list_repositories` result.
    pub fn with_repository(self, owner: &str, name: &str) -> Self {
        self.state().repositories.push(RepositorySummary {
            owner: owner.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Configure an operation to fail.
    ///
    /// # Example
    ///
    /// ```
    /// use sorpush::forge::mock::{MockForge, FailOn};
    /// use sorpush::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::PutFile(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Current content of a file (for test verification).
    pub fn file_content(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        self.state()
            .branches
            .get(branch)
            .and_then(|b| b.files.get(&normalize(path)).cloned())
    }

    /// Head commit of a branch (for test verification).
    pub fn branch_head(&self, name: &str) -> Option<String> {
        self.state().branches.get(name).map(|b| b.head.clone())
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.state().branches.contains_key(name)
    }

    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.state();
        let error = match &inner.fail_on {
            Some(FailOn::ListDirectory(e)) if expected == "list_directory" => e,
            Some(FailOn::GetEntry(e)) if expected == "get_entry" => e,
            Some(FailOn::PutFile(e)) if expected == "put_file" => e,
            Some(FailOn::DefaultBranch(e)) if expected == "default_branch" => e,
            Some(FailOn::GetBranch(e)) if expected == "get_branch" => e,
            Some(FailOn::CreateRef(e)) if expected == "create_ref" => e,
            Some(FailOn::Merge(e)) if expected == "merge" => e,
            Some(FailOn::ListBranches(e)) if expected == "list_branches" => e,
            Some(FailOn::ListRepositories(e)) if expected == "list_repositories" => e,
            _ => return Ok(()),
        };
        Err(error.clone())
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForgeInner {
    fn next_commit(&mut self, salt: &str) -> String {
        self.commit_counter += 1;
        blob_sha(format!("commit:{}:{}", self.commit_counter, salt).as_bytes())
    }

    fn ensure_branch(&mut self, name: &str) {
        if !self.branches.contains_key(name) {
            let head = self.next_commit(name);
            self.branches.insert(
                name.to_string(),
                MockBranch {
                    head,
                    files: BTreeMap::new(),
                },
            );
        }
    }

    fn branch(&self, name: &str) -> Result<&MockBranch, ForgeError> {
        self.branches
            .get(name)
            .ok_or_else(|| ForgeError::NotFound(format!("Branch not found: {}", name)))
    }

    fn is_directory(&self, branch: &MockBranch, path: &str) -> bool {
        self.directories
            .iter()
            .any(|d| d == path || is_below(d, path))
            || branch.files.keys().any(|f| is_below(f, path))
    }
}

#[async_trait]
impl ContentApi for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_directory(
        &self,
        _cred: &Credential,
        _repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<ContentEntry>, ForgeError> {
        let dir = normalize(path);
        self.record(MockOperation::ListDirectory { path: dir.clone() });
        self.check_fail("list_directory")?;

        let inner = self.state();
        let branch = inner.branch(&inner.default_branch)?;

        if branch.files.contains_key(&dir) {
            return Err(ForgeError::MalformedResponse(format!(
                "{} is not a directory",
                dir
            )));
        }
        if !inner.is_directory(branch, &dir) {
            return Err(ForgeError::NotFound("Not Found".into()));
        }

        // Immediate children: name -> (is_directory, sha)
        let mut children: BTreeMap<String, Option<String>> = BTreeMap::new();
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };
        for (file, content) in &branch.files {
            if let Some(rest) = file.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((child, _)) => {
                        children.insert(child.to_string(), None);
                    }
                    None => {
                        children.insert(rest.to_string(), Some(blob_sha(content)));
                    }
                }
            }
        }
        for explicit in &inner.directories {
            if let Some(rest) = explicit.strip_prefix(&prefix) {
                let child = rest.split('/').next().unwrap_or_default();
                if !child.is_empty() {
                    children.entry(child.to_string()).or_insert(None);
                }
            }
        }

        Ok(children
            .into_iter()
            .map(|(name, sha)| ContentEntry {
                path: format!("{}{}", prefix, name),
                name,
                is_directory: sha.is_none(),
                sha,
            })
            .collect())
    }

    async fn get_entry(
        &self,
        _cred: &Credential,
        _repo: &RepositoryRef,
        path: &str,
        branch: &str,
    ) -> Result<ContentEntry, ForgeError> {
        let path = normalize(path);
        self.record(MockOperation::GetEntry {
            path: path.clone(),
            branch: branch.to_string(),
        });
        self.check_fail("get_entry")?;

        let inner = self.state();
        let state = inner.branch(branch)?;
        let name = path.rsplit('/').next().unwrap_or_default().to_string();

        if let Some(content) = state.files.get(&path) {
            return Ok(ContentEntry {
                name,
                path,
                sha: Some(blob_sha(content)),
                is_directory: false,
            });
        }
        if inner.is_directory(state, &path) {
            return Ok(ContentEntry {
                name,
                path,
                sha: None,
                is_directory: true,
            });
        }
        Err(ForgeError::NotFound("Not Found".into()))
    }

    async fn put_file(
        &self,
        _cred: &Credential,
        _repo: &RepositoryRef,
        request: PutFileRequest,
    ) -> Result<serde_json::Value, ForgeError> {
        let path = normalize(&request.path);
        self.record(MockOperation::PutFile {
            path: path.clone(),
            branch: request.branch.clone(),
            sha: request.sha.clone(),
            content: request.content.clone(),
        });
        self.check_fail("put_file")?;

        let mut inner = self.state();
        let current = inner
            .branch(&request.branch)?
            .files
            .get(&path)
            .map(|c| blob_sha(c));

        match (current.as_deref(), request.sha.as_deref()) {
            (Some(_), None) => {
                return Err(ForgeError::Conflict(
                    "Invalid request. \"sha\" wasn't supplied.".into(),
                ))
            }
            (Some(existing), Some(given)) if existing != given => {
                return Err(ForgeError::Conflict(format!(
                    "{} does not match {}",
                    path, given
                )))
            }
            (None, Some(_)) => {
                return Err(ForgeError::Conflict(format!(
                    "sha supplied but {} does not exist",
                    path
                )))
            }
            _ => {}
        }

        let commit = inner.next_commit(&path);
        let new_sha = blob_sha(&request.content);
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        if let Some(b) = inner.branches.get_mut(&request.branch) {
            b.files.insert(path.clone(), request.content);
            b.head = commit.clone();
        }

        Ok(json!({
            "content": { "name": name, "path": path, "sha": new_sha, "type": "file" },
            "commit": { "sha": commit, "message": request.message }
        }))
    }

    async fn default_branch(
        &self,
        _cred: &Credential,
        _repo: &RepositoryRef,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::DefaultBranch);
        self.check_fail("default_branch")?;
        Ok(self.state().default_branch.clone())
    }

    async fn get_branch(
        &self,
        _cred: &Credential,
        _repo: &RepositoryRef,
        name: &str,
    ) -> Result<BranchRef, ForgeError> {
        self.record(MockOperation::GetBranch {
            name: name.to_string(),
        });
        self.check_fail("get_branch")?;

        let inner = self.state();
        let branch = inner.branch(name)?;
        Ok(BranchRef {
            name: name.to_string(),
            head_sha: branch.head.clone(),
        })
    }

    async fn create_ref(
        &self,
        _cred: &Credential,
        _repo: &RepositoryRef,
        name: &str,
        sha: &str,
    ) -> Result<serde_json::Value, ForgeError> {
        self.record(MockOperation::CreateRef {
            name: name.to_string(),
            sha: sha.to_string(),
        });
        self.check_fail("create_ref")?;

        let mut inner = self.state();
        if inner.branches.contains_key(name) {
            return Err(ForgeError::Conflict("Reference already exists".into()));
        }
        let files = inner
            .branches
            .values()
            .find(|b| b.head == sha)
            .map(|b| b.files.clone())
            .ok_or_else(|| ForgeError::RemoteFailure {
                status: 422,
                message: "Object does not exist".into(),
            })?;
        inner.branches.insert(
            name.to_string(),
            MockBranch {
                head: sha.to_string(),
                files,
            },
        );

        Ok(json!({
            "ref": format!("refs/heads/{}", name),
            "object": { "sha": sha, "type": "commit" }
        }))
    }

    async fn merge(
        &self,
        _cred: &Credential,
        _repo: &RepositoryRef,
        request: MergeRequest,
    ) -> Result<MergeResult, ForgeError> {
        self.record(MockOperation::Merge {
            base: request.base.clone(),
            head: request.head.clone(),
        });
        self.check_fail("merge")?;

        let mut inner = self.state();
        let head_files = inner.branch(&request.head)?.files.clone();
        let base = inner.branch(&request.base)?;

        let changed: Vec<String> = head_files
            .iter()
            .filter(|(path, content)| base.files.get(*path) != Some(*content))
            .map(|(path, _)| path.clone())
            .collect();
        if changed.is_empty() {
            return Ok(MergeResult::NothingToMerge);
        }

        let commit = inner.next_commit(&request.head);
        if let Some(b) = inner.branches.get_mut(&request.base) {
            for path in &changed {
                if let Some(content) = head_files.get(path) {
                    b.files.insert(path.clone(), content.clone());
                }
            }
            b.head = commit.clone();
        }

        Ok(MergeResult::Merged(json!({
            "sha": commit,
            "commit": { "message": request.commit_message }
        })))
    }

    async fn list_branches(
        &self,
        _cred: &Credential,
        _repo: &RepositoryRef,
    ) -> Result<Vec<String>, ForgeError> {
        self.record(MockOperation::ListBranches);
        self.check_fail("list_branches")?;
        Ok(self.state().branches.keys().cloned().collect())
    }

    async fn list_repositories(
        &self,
        _cred: &Credential,
    ) -> Result<Vec<RepositorySummary>, ForgeError> {
        self.record(MockOperation::ListRepositories);
        self.check_fail("list_repositories")?;
        Ok(self.state().repositories.clone())
    }
}
