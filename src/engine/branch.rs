//! engine::branch
//!
//! Branch Manager: idempotent branch creation from the default branch
//! head, and server-side merges.

use serde::Serialize;
use tracing::{debug, info};

use super::EngineError;
use crate::auth::Credential;
use crate::core::types::{BranchName, BranchRef, RepositoryRef};
use crate::forge::{ContentApi, ForgeError, MergeRequest, MergeResult};

/// Whether [`ensure_branch`] had to create the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Created,
    AlreadyExisted,
}

/// Result of [`ensure_branch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsuredBranch {
    pub branch: BranchRef,
    pub status: BranchStatus,
}

/// Result of [`merge_branches`].
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// A merge commit was created; provider body verbatim.
    Merged(serde_json::Value),
    /// Base already contained head.
    NothingToMerge,
}

/// Make sure `name` exists, creating it from the default branch head if not.
///
/// An existing branch is returned untouched with `AlreadyExisted`.
///
/// # Errors
///
/// - `InvalidRequest` if `name` is not a valid branch name
/// - Any failure reading the default branch or its head (no fallback)
/// - `Forge(Conflict)` if another writer created the ref after the check
pub async fn ensure_branch(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    name: &str,
) -> Result<EnsuredBranch, EngineError> {
    let name = BranchName::new(name)?;

    match api.get_branch(cred, repo, name.as_str()).await {
        Ok(branch) => {
            info!(%repo, branch = %name, "branch already exists");
            return Ok(EnsuredBranch {
                branch,
                status: BranchStatus::AlreadyExisted,
            });
        }
        Err(ForgeError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let default = api.default_branch(cred, repo).await?;
    let base = api.get_branch(cred, repo, &default).await?;
    debug!(%repo, branch = %name, from = %default, sha = %base.head_sha, "creating branch");

    api.create_ref(cred, repo, name.as_str(), &base.head_sha)
        .await?;
    info!(%repo, branch = %name, from = %default, "branch created");

    Ok(EnsuredBranch {
        branch: BranchRef {
            name: name.to_string(),
            head_sha: base.head_sha,
        },
        status: BranchStatus::Created,
    })
}

/// Merge `head` into `base` on the provider.
///
/// # Errors
///
/// - `InvalidRequest` for invalid names or `base == head`
/// - `Forge(Conflict)` if the merge has conflicts
/// - `Forge(NotFound)` if either branch is missing
pub async fn merge_branches(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    base: &str,
    head: &str,
    message: Option<String>,
) -> Result<MergeOutcome, EngineError> {
    let base = BranchName::new(base)?;
    let head = BranchName::new(head)?;
    if base == head {
        return Err(EngineError::InvalidRequest(format!(
            "cannot merge '{}' into itself",
            base
        )));
    }

    let commit_message = message.unwrap_or_else(|| format!("Merge {} into {}", head, base));
    let result = api
        .merge(
            cred,
            repo,
            MergeRequest {
                base: base.to_string(),
                head: head.to_string(),
                commit_message,
            },
        )
        .await?;

    Ok(match result {
        MergeResult::Merged(response) => {
            info!(%repo, %base, %head, "branches merged");
            MergeOutcome::Merged(response)
        }
        MergeResult::NothingToMerge => {
            info!(%repo, %base, %head, "nothing to merge");
            MergeOutcome::NothingToMerge
        }
    })
}
