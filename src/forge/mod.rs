//! forge
//!
//! Abstraction over the remote repository provider's content API.
//!
//! # Architecture
//!
//! The [`ContentApi`] trait defines the handful of primitives the engine
//! needs: list a directory, read an entry's sha, write a file, read and
//! create branches, merge. The engine is written against the trait only,
//! so tests run against [`mock::MockForge`] and production against
//! [`github::GitHubForge`].
//!
//! # Modules
//!
//! - `traits`: Core `ContentApi` trait, request/response types and `ForgeError`
//! - [`github`]: GitHub REST implementation
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `correlation`: Request/correlation/client id headers
//!
//! # Example
//!
//! ```ignore
//! use sorpush::forge::{github::GitHubForge, ContentApi};
//!
//! let forge = GitHubForge::new(config.api_base(), config.client_id(), config.timeout())?;
//! let branch = forge.get_branch(&cred, &repo, "main").await?;
//! println!("main is at {}", branch.head_sha);
//! ```

mod correlation;
pub mod github;
pub mod mock;
mod traits;

pub use correlation::{
    correlation_headers, CLIENT_ID_HEADER, CORRELATION_ID_HEADER, REQUEST_ID_HEADER,
};
pub use traits::*;
