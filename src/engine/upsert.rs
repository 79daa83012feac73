//! engine::upsert
//!
//! Upsert Engine: create-or-update of a single file on a branch.
//!
//! # Protocol
//!
//! 1. Probe the path on the branch
//! 2. Probe returned a sha: update carrying that sha
//! 3. Probe returned not-found: create with no sha field at all
//! 4. Anything else propagates unchanged
//!
//! Probe and write are separate requests. A concurrent writer between
//! them makes the write fail with `Conflict`; that is terminal for the
//! current call. Callers that want a retry re-invoke [`upsert`].

use serde::Serialize;
use tracing::{debug, info};

use super::layout::resolve_layout;
use super::EngineError;
use crate::auth::Credential;
use crate::core::paths::build_path;
use crate::core::types::{
    BranchName, ContentEntry, LayoutKind, RepositoryRef, SorContext, UpsertAction, UpsertResult,
};
use crate::forge::{ContentApi, ForgeError, PutFileRequest};

/// One file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    /// Target branch
    pub branch: String,
    /// Repository-relative path
    pub path: String,
    /// Raw content
    pub content: Vec<u8>,
    /// Commit message
    pub message: String,
}

impl FileWrite {
    fn validate(&self) -> Result<(), EngineError> {
        BranchName::new(self.branch.as_str())?;
        validate_path(&self.path)?;
        if self.message.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "commit message cannot be empty".into(),
            ));
        }
        Ok(())
    }

    fn into_request(self, sha: Option<String>) -> PutFileRequest {
        PutFileRequest {
            path: self.path,
            message: self.message,
            content: self.content,
            branch: self.branch,
            sha,
        }
    }
}

/// A feed artifact to publish at its layout-derived path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPush {
    pub context: SorContext,
    pub branch: String,
    pub content: Vec<u8>,
    /// Commit message; defaults to one naming the feed and kind
    pub message: Option<String>,
}

/// Result of [`push_artifact`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushOutcome {
    pub layout: LayoutKind,
    pub path: String,
    #[serde(flatten)]
    pub result: UpsertResult,
}

fn validate_path(path: &str) -> Result<(), EngineError> {
    if path.is_empty() || path.starts_with('/') || path.ends_with('/') {
        return Err(EngineError::InvalidRequest(format!(
            "'{}' is not a repository-relative file path",
            path
        )));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(EngineError::InvalidRequest(format!(
            "'{}' contains an empty or relative segment",
            path
        )));
    }
    Ok(())
}

/// Read the sha of an existing file.
///
/// `Ok(None)` means the path does not exist on the branch.
async fn probe_sha(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    path: &str,
    branch: &str,
) -> Result<Option<String>, EngineError> {
    match api.get_entry(cred, repo, path, branch).await {
        Ok(ContentEntry {
            is_directory: true, ..
        }) => Err(ForgeError::MalformedResponse(format!(
            "{} is a directory, not a file",
            path
        ))
        .into()),
        Ok(ContentEntry { sha: Some(sha), .. }) => Ok(Some(sha)),
        Ok(_) => Err(ForgeError::MalformedResponse(format!("no sha reported for {}", path)).into()),
        Err(ForgeError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create `path` on `branch`, or update it if it already exists.
///
/// # Errors
///
/// - `InvalidRequest` for a bad branch, path or empty message
/// - `Forge(Conflict)` if another writer changed the file after the probe
/// - `Forge(MalformedResponse)` if the path is a directory or has no sha
/// - Any other probe or write failure, unchanged
pub async fn upsert(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    write: FileWrite,
) -> Result<UpsertResult, EngineError> {
    write.validate()?;

    let sha = probe_sha(api, cred, repo, &write.path, &write.branch).await?;
    let action = if sha.is_some() {
        UpsertAction::Updated
    } else {
        UpsertAction::Created
    };
    debug!(%repo, path = %write.path, branch = %write.branch, %action, "routing upsert");

    let path = write.path.clone();
    let provider_response = api.put_file(cred, repo, write.into_request(sha)).await?;
    info!(%repo, %path, %action, "file written");

    Ok(UpsertResult {
        action,
        provider_response,
    })
}

/// Create a file that must not exist yet. No probe is made.
///
/// # Errors
///
/// - `Forge(Conflict)` if the file already exists
pub async fn add_file(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    write: FileWrite,
) -> Result<UpsertResult, EngineError> {
    write.validate()?;
    let path = write.path.clone();
    let provider_response = api.put_file(cred, repo, write.into_request(None)).await?;
    info!(%repo, %path, "file added");
    Ok(UpsertResult {
        action: UpsertAction::Created,
        provider_response,
    })
}

/// Replace a file that must already exist.
///
/// # Errors
///
/// - `Forge(NotFound)` if the file does not exist on the branch
pub async fn update_file(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    write: FileWrite,
) -> Result<UpsertResult, EngineError> {
    write.validate()?;
    let sha = probe_sha(api, cred, repo, &write.path, &write.branch)
        .await?
        .ok_or_else(|| {
            ForgeError::NotFound(format!("{} on branch {}", write.path, write.branch))
        })?;

    let path = write.path.clone();
    let provider_response = api.put_file(cred, repo, write.into_request(Some(sha))).await?;
    info!(%repo, %path, "file updated");
    Ok(UpsertResult {
        action: UpsertAction::Updated,
        provider_response,
    })
}

/// Publish a feed artifact: resolve layout, build its path, upsert.
pub async fn push_artifact(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    push: ArtifactPush,
) -> Result<PushOutcome, EngineError> {
    let ctx = push.context;
    let layout = resolve_layout(api, cred, repo, ctx.sor()).await?;
    let path = build_path(&ctx, layout);
    let message = push.message.unwrap_or_else(|| {
        format!(
            "Update {} {} for {}",
            ctx.feed_name(),
            ctx.kind(),
            ctx.sor()
        )
    });

    let result = upsert(
        api,
        cred,
        repo,
        FileWrite {
            branch: push.branch,
            path: path.clone(),
            content: push.content,
            message,
        },
    )
    .await?;

    Ok(PushOutcome {
        layout,
        path,
        result,
    })
}
