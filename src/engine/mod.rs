//! engine
//!
//! Publishes feed artifacts into a remote repository.
//!
//! # Architecture
//!
//! Every operation is a short, synchronous sequence of remote calls made
//! through a [`ContentApi`](crate::forge::ContentApi):
//!
//! ```text
//! push:   resolve layout -> build path -> probe sha -> create | update
//! branch: read ref -> [read default branch -> read head -> create ref]
//! merge:  merge head into base
//! ```
//!
//! - [`layout`]: Layout Resolver (flat vs nested SOR convention)
//! - [`upsert`]: Upsert Engine (probe-then-write with optimistic concurrency)
//! - [`branch`]: Branch Manager (idempotent create, merge)
//! - [`dispatch`]: Tagged operation union and its single entry point
//!
//! # Invariants
//!
//! - Each remote call is attempted once; nothing here retries
//! - An update always carries the sha read from the same path and branch
//! - A create never carries a sha
//! - A failed layout or sha lookup is reported, never replaced by a guess
//! - Nothing is cached between operations
//!
//! # Example
//!
//! ```ignore
//! use sorpush::engine::{dispatch, Operation};
//!
//! let op: Operation = serde_json::from_str(&request_body)?;
//! let outcome = dispatch(&forge, &credentials, op).await?;
//! println!("{}", serde_json::to_string_pretty(&outcome)?);
//! ```

pub mod branch;
pub mod dispatch;
pub mod layout;
pub mod upsert;

pub use branch::{ensure_branch, merge_branches, BranchStatus, EnsuredBranch, MergeOutcome};
pub use dispatch::{dispatch, Operation, OperationFailure, OperationOutcome};
pub use layout::{classify_listing, resolve_layout, FLAT_LAYOUT_FOLDERS};
pub use upsert::{add_file, push_artifact, update_file, upsert, ArtifactPush, FileWrite, PushOutcome};

use thiserror::Error;

use crate::auth::AuthError;
use crate::core::types::{TypeError, UnsupportedArtifactKind};
use crate::forge::ForgeError;

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No credential was available; no remote call was made.
    #[error("not authenticated: no credential available for this operation")]
    Unauthenticated,

    /// The artifact kind has no destination folder.
    #[error(transparent)]
    UnsupportedArtifactKind(#[from] UnsupportedArtifactKind),

    /// A request field failed validation before any remote call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Listing the SOR directory failed for a reason other than absence.
    #[error("cannot resolve layout for sor '{sor}': {source}")]
    LayoutResolution {
        sor: String,
        #[source]
        source: ForgeError,
    },

    /// A remote call failed.
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// The credential source failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<TypeError> for EngineError {
    fn from(err: TypeError) -> Self {
        EngineError::InvalidRequest(err.to_string())
    }
}

impl EngineError {
    /// Stable machine-readable name for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Unauthenticated => "unauthenticated",
            EngineError::UnsupportedArtifactKind(_) => "unsupported_artifact_kind",
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::LayoutResolution { .. } => "layout_resolution",
            EngineError::Auth(_) => "auth",
            EngineError::Forge(err) => match err {
                ForgeError::AuthFailed(_) => "auth_failed",
                ForgeError::NotFound(_) => "not_found",
                ForgeError::Conflict(_) => "conflict",
                ForgeError::RateLimited => "rate_limited",
                ForgeError::RemoteFailure { .. } => "remote_failure",
                ForgeError::MalformedResponse(_) => "malformed_response",
                ForgeError::Network(_) => "network",
            },
        }
    }

    /// Whether re-invoking the whole operation later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Forge(err) | EngineError::LayoutResolution { source: err, .. } => {
                err.is_transient()
            }
            _ => false,
        }
    }
}
