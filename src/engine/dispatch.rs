//! engine::dispatch
//!
//! Single entry point for the five publishing operations.
//!
//! # Wire format
//!
//! Requests are JSON objects tagged by `operation`, with camelCase fields.
//! File content is base64.
//!
//! ```json
//! {
//!   "operation": "pushFile",
//!   "owner": "octocat",
//!   "repo": "feeds",
//!   "branch": "feature/orders",
//!   "sor": "sor1",
//!   "feedName": "orders",
//!   "artifactKind": "sql",
//!   "content": "c2VsZWN0IDE="
//! }
//! ```
//!
//! An unknown `operation` fails deserialization; there is no runtime
//! fallback branch.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::branch::{ensure_branch, merge_branches, BranchStatus, MergeOutcome};
use super::upsert::{add_file, push_artifact, update_file, upsert, ArtifactPush, FileWrite};
use super::EngineError;
use crate::auth::{Credential, CredentialSource};
use crate::core::types::{ArtifactKind, LayoutKind, RepositoryRef, SorContext, UpsertAction};
use crate::forge::ContentApi;

/// One publishing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "operation",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Operation {
    /// Ensure a branch exists, creating it from the default branch head.
    CreateBranch {
        owner: String,
        repo: String,
        branch_name: String,
    },
    /// Publish a feed artifact at its layout-derived path.
    PushFile {
        owner: String,
        repo: String,
        branch: String,
        sor: String,
        feed_name: String,
        artifact_kind: String,
        #[serde(with = "base64_content")]
        content: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        commit_message: Option<String>,
    },
    /// Replace an existing file at an explicit path.
    UpdateFile {
        owner: String,
        repo: String,
        branch: String,
        path: String,
        #[serde(with = "base64_content")]
        content: Vec<u8>,
        commit_message: String,
        /// Create the file when absent instead of failing
        #[serde(default)]
        upsert: bool,
    },
    /// Create a new file at an explicit path.
    AddFile {
        owner: String,
        repo: String,
        branch: String,
        path: String,
        #[serde(with = "base64_content")]
        content: Vec<u8>,
        commit_message: String,
    },
    /// Merge `head` into `base`.
    MergeBranch {
        owner: String,
        repo: String,
        base: String,
        head: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        commit_message: Option<String>,
    },
}

impl Operation {
    /// Wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateBranch { .. } => "createBranch",
            Operation::PushFile { .. } => "pushFile",
            Operation::UpdateFile { .. } => "updateFile",
            Operation::AddFile { .. } => "addFile",
            Operation::MergeBranch { .. } => "mergeBranch",
        }
    }

    fn repository(&self) -> Result<RepositoryRef, EngineError> {
        let (owner, repo) = match self {
            Operation::CreateBranch { owner, repo, .. }
            | Operation::PushFile { owner, repo, .. }
            | Operation::UpdateFile { owner, repo, .. }
            | Operation::AddFile { owner, repo, .. }
            | Operation::MergeBranch { owner, repo, .. } => (owner, repo),
        };
        Ok(RepositoryRef::new(owner.as_str(), repo.as_str())?)
    }
}

/// Normalized result of a successful operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "outcome",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum OperationOutcome {
    Branch {
        name: String,
        head_sha: String,
        status: BranchStatus,
    },
    File {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        layout: Option<LayoutKind>,
        action: UpsertAction,
        provider_response: serde_json::Value,
    },
    Merge {
        merged: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider_response: Option<serde_json::Value>,
    },
}

/// Structured failure for callers that report errors as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationFailure {
    pub kind: &'static str,
    pub message: String,
}

impl From<&EngineError> for OperationFailure {
    fn from(err: &EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Run one operation.
///
/// The credential is resolved first; without one, `Unauthenticated` is
/// returned and no remote call is made. Request fields are validated
/// before the first remote call as well.
pub async fn dispatch(
    api: &dyn ContentApi,
    credentials: &dyn CredentialSource,
    operation: Operation,
) -> Result<OperationOutcome, EngineError> {
    let name = operation.name();
    let cred = credentials
        .credential()
        .await?
        .ok_or(EngineError::Unauthenticated)?;
    let repo = operation.repository()?;
    info!(operation = name, %repo, provider = api.name(), "dispatching");

    let result = execute(api, &cred, &repo, operation).await;
    if let Err(ref err) = result {
        warn!(operation = name, %repo, kind = err.kind(), "operation failed");
    }
    result
}

async fn execute(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    operation: Operation,
) -> Result<OperationOutcome, EngineError> {
    match operation {
        Operation::CreateBranch { branch_name, .. } => {
            let ensured = ensure_branch(api, cred, repo, &branch_name).await?;
            Ok(OperationOutcome::Branch {
                name: ensured.branch.name,
                head_sha: ensured.branch.head_sha,
                status: ensured.status,
            })
        }
        Operation::PushFile {
            branch,
            sor,
            feed_name,
            artifact_kind,
            content,
            commit_message,
            ..
        } => {
            let kind: ArtifactKind = artifact_kind.parse()?;
            let context = SorContext::new(sor, feed_name, kind)?;
            let pushed = push_artifact(
                api,
                cred,
                repo,
                ArtifactPush {
                    context,
                    branch,
                    content,
                    message: commit_message,
                },
            )
            .await?;
            Ok(OperationOutcome::File {
                path: pushed.path,
                layout: Some(pushed.layout),
                action: pushed.result.action,
                provider_response: pushed.result.provider_response,
            })
        }
        Operation::UpdateFile {
            branch,
            path,
            content,
            commit_message,
            upsert: create_if_missing,
            ..
        } => {
            let write = FileWrite {
                branch,
                path: path.clone(),
                content,
                message: commit_message,
            };
            let result = if create_if_missing {
                upsert(api, cred, repo, write).await?
            } else {
                update_file(api, cred, repo, write).await?
            };
            Ok(OperationOutcome::File {
                path,
                layout: None,
                action: result.action,
                provider_response: result.provider_response,
            })
        }
        Operation::AddFile {
            branch,
            path,
            content,
            commit_message,
            ..
        } => {
            let result = add_file(
                api,
                cred,
                repo,
                FileWrite {
                    branch,
                    path: path.clone(),
                    content,
                    message: commit_message,
                },
            )
            .await?;
            Ok(OperationOutcome::File {
                path,
                layout: None,
                action: result.action,
                provider_response: result.provider_response,
            })
        }
        Operation::MergeBranch {
            base,
            head,
            commit_message,
            ..
        } => {
            let outcome = merge_branches(api, cred, repo, &base, &head, commit_message).await?;
            Ok(match outcome {
                MergeOutcome::Merged(response) => OperationOutcome::Merge {
                    merged: true,
                    provider_response: Some(response),
                },
                MergeOutcome::NothingToMerge => OperationOutcome::Merge {
                    merged: false,
                    provider_response: None,
                },
            })
        }
    }
}

/// Base64 (standard alphabet) encoding for `content` fields.
///
/// Whitespace inside the encoded string is ignored on input.
mod base64_content {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact)
            .map_err(|e| serde::de::Error::custom(format!("content is not valid base64: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, StaticCredential};
    use crate::forge::mock::{MockForge, MockOperation};
    use crate::forge::ForgeError;
    use serde_json::json;

    fn signed_in() -> StaticCredential {
        StaticCredential::new(Some(Credential::new("token").unwrap()))
    }

    fn parse(value: serde_json::Value) -> Operation {
        serde_json::from_value(value).unwrap()
    }

    mod wire {
        use super::*;

        #[test]
        fn push_file_decodes_base64_content() {
            let op = parse(json!({
                "operation": "pushFile",
                "owner": "octocat",
                "repo": "feeds",
                "branch": "main",
                "sor": "sor1",
                "feedName": "orders",
                "artifactKind": "sql",
                "content": "c2VsZWN0\nIDE="
            }));
            match op {
                Operation::PushFile {
                    content,
                    feed_name,
                    commit_message,
                    ..
                } => {
                    assert_eq!(content, b"select 1");
                    assert_eq!(feed_name, "orders");
                    assert!(commit_message.is_none());
                }
                other => panic!("unexpected operation: {:?}", other),
            }
        }

        #[test]
        fn unknown_operation_is_rejected() {
            let result: Result<Operation, _> = serde_json::from_value(json!({
                "operation": "deleteFile",
                "owner": "o",
                "repo": "r"
            }));
            assert!(result.is_err());
        }

        #[test]
        fn invalid_base64_is_rejected() {
            let result: Result<Operation, _> = serde_json::from_value(json!({
                "operation": "addFile",
                "owner": "o",
                "repo": "r",
                "branch": "main",
                "path": "a.sql",
                "content": "***",
                "commitMessage": "add"
            }));
            assert!(result.is_err());
        }

        #[test]
        fn serializes_with_tag_and_camel_case() {
            let op = Operation::MergeBranch {
                owner: "o".into(),
                repo: "r".into(),
                base: "main".into(),
                head: "feature".into(),
                commit_message: None,
            };
            assert_eq!(
                serde_json::to_value(&op).unwrap(),
                json!({"operation": "mergeBranch", "owner": "o", "repo": "r", "base": "main", "head": "feature"})
            );
            assert_eq!(op.name(), "mergeBranch");
        }

        #[test]
        fn outcome_serialization() {
            let outcome = OperationOutcome::Branch {
                name: "feature".into(),
                head_sha: "abc".into(),
                status: BranchStatus::AlreadyExisted,
            };
            assert_eq!(
                serde_json::to_value(&outcome).unwrap(),
                json!({"outcome": "branch", "name": "feature", "headSha": "abc", "status": "already_existed"})
            );
        }
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        let forge = MockForge::new();
        let op = parse(json!({
            "operation": "createBranch",
            "owner": "octocat",
            "repo": "feeds",
            "branchName": "feature"
        }));
        let err = dispatch(&forge, &StaticCredential::anonymous(), op)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthenticated));
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn unsupported_kind_is_reported_before_any_call() {
        let forge = MockForge::new();
        let op = parse(json!({
            "operation": "pushFile",
            "owner": "octocat",
            "repo": "feeds",
            "branch": "main",
            "sor": "sor1",
            "feedName": "orders",
            "artifactKind": "parquet",
            "content": ""
        }));
        let err = dispatch(&forge, &signed_in(), op).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedArtifactKind(_)));
        assert_eq!(OperationFailure::from(&err).kind, "unsupported_artifact_kind");
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn push_file_reports_layout_and_path() {
        let forge = MockForge::new();
        let op = parse(json!({
            "operation": "pushFile",
            "owner": "octocat",
            "repo": "feeds",
            "branch": "main",
            "sor": "sor2",
            "feedName": "orders",
            "artifactKind": "json",
            "content": "e30="
        }));
        let outcome = dispatch(&forge, &signed_in(), op).await.unwrap();
        match outcome {
            OperationOutcome::File {
                path,
                layout,
                action,
                ..
            } => {
                assert_eq!(path, "src/batch/sor2/orders/config/dci/json/orders.json");
                assert_eq!(layout, Some(LayoutKind::NestedUnderFeed));
                assert_eq!(action, UpsertAction::Created);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_file_without_upsert_requires_existing() {
        let forge = MockForge::new();
        let op = parse(json!({
            "operation": "updateFile",
            "owner": "octocat",
            "repo": "feeds",
            "branch": "main",
            "path": "docs/readme.txt",
            "content": "aGk=",
            "commitMessage": "update"
        }));
        let err = dispatch(&forge, &signed_in(), op).await.unwrap_err();
        assert!(matches!(err, EngineError::Forge(ForgeError::NotFound(_))));
        assert!(!forge
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::PutFile { .. })));
    }

    #[tokio::test]
    async fn update_file_with_upsert_creates() {
        let forge = MockForge::new();
        let op = parse(json!({
            "operation": "updateFile",
            "owner": "octocat",
            "repo": "feeds",
            "branch": "main",
            "path": "docs/readme.txt",
            "content": "aGk=",
            "commitMessage": "update",
            "upsert": true
        }));
        let outcome = dispatch(&forge, &signed_in(), op).await.unwrap();
        assert!(matches!(
            outcome,
            OperationOutcome::File {
                action: UpsertAction::Created,
                ..
            }
        ));
        assert_eq!(forge.file_content("main", "docs/readme.txt").unwrap(), b"hi");
    }

    #[tokio::test]
    async fn merge_branch_outcomes() {
        let forge = MockForge::new().with_file("feature", "a.sql", "x");
        let op = parse(json!({
            "operation": "mergeBranch",
            "owner": "octocat",
            "repo": "feeds",
            "base": "main",
            "head": "feature"
        }));

        let first = dispatch(&forge, &signed_in(), op.clone()).await.unwrap();
        assert!(matches!(first, OperationOutcome::Merge { merged: true, .. }));

        let second = dispatch(&forge, &signed_in(), op).await.unwrap();
        assert_eq!(
            second,
            OperationOutcome::Merge {
                merged: false,
                provider_response: None
            }
        );
    }

    #[tokio::test]
    async fn invalid_repository_is_rejected() {
        let forge = MockForge::new();
        let op = parse(json!({
            "operation": "createBranch",
            "owner": "octo cat",
            "repo": "feeds",
            "branchName": "feature"
        }));
        let err = dispatch(&forge, &signed_in(), op).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }
}
