//! sorpush - layout-aware publishing of feed artifacts to GitHub
//!
//! sorpush writes generated feed artifacts (JSON, SQL, scripts, metadata,
//! HQL, DDL) into a GitHub repository under `src/batch/{sor}/`, choosing
//! between the flat and nested folder conventions by inspecting what the
//! SOR already contains. It also creates branches idempotently and merges
//! them through the provider.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Layout resolution, upserts, branches, and the operation dispatcher
//! - [`core`] - Domain types, path construction, and configuration
//! - [`forge`] - The content API seam with GitHub and in-memory implementations
//! - [`auth`] - Credentials and the OAuth web flow
//! - [`secrets`] - Secret storage abstraction
//!
//! # Correctness Invariants
//!
//! 1. An update always carries the blob sha read from the same path and branch
//! 2. A create never carries a sha
//! 3. Layout and sha lookups that fail are reported, never guessed
//! 4. Tokens are never logged or printed

pub mod auth;
pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod secrets;
