//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepositoryRef`] - Target repository (owner + name)
//! - [`ArtifactKind`] - Kind of feed artifact being published
//! - [`SorContext`] - What is being written, and for which system of record
//! - [`LayoutKind`] - Directory convention used by a SOR
//! - [`ContentEntry`] - Provider view of a tree node
//! - [`BranchName`] - Validated Git branch name
//! - [`BranchRef`] - Branch name plus head commit
//! - [`UpsertResult`] - Normalized outcome of a create-or-update
//!
//! # Validation
//!
//! These types enforce validity at construction time. A SOR or feed name
//! is a single path segment, so it can never escape `src/batch/`.
//!
//! # Examples
//!
//! ```
//! use sorpush::core::types::{ArtifactKind, BranchName, SorContext};
//!
//! let kind: ArtifactKind = "SQL".parse().unwrap();
//! assert_eq!(kind, ArtifactKind::Sql);
//! assert!("parquet".parse::<ArtifactKind>().is_err());
//!
//! let ctx = SorContext::new("sor1", "orders", kind).unwrap();
//! assert_eq!(ctx.sor(), "sor1");
//! assert!(SorContext::new("../etc", "orders", kind).is_err());
//!
//! assert!(BranchName::new("feature/orders").is_ok());
//! assert!(BranchName::new("has space").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid {field}: {reason}")]
    InvalidSegment { field: &'static str, reason: String },

    #[error("invalid repository: {0}")]
    InvalidRepository(String),
}

/// An artifact kind string that is not one of the recognized kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported artifact kind '{0}' (expected one of: json, sql, scripts, metadata, hql, ddl)")]
pub struct UnsupportedArtifactKind(pub String);

/// Identifies a repository on the remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepositoryRef {
    /// Create a repository reference.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepository` if either part is empty or
    /// contains a `/`.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let name = name.into();
        for (label, value) in [("owner", &owner), ("name", &name)] {
            if value.is_empty() {
                return Err(TypeError::InvalidRepository(format!(
                    "{} cannot be empty",
                    label
                )));
            }
            if value.contains('/') || value.chars().any(|c| c.is_whitespace()) {
                return Err(TypeError::InvalidRepository(format!(
                    "{} '{}' contains '/' or whitespace",
                    label, value
                )));
            }
        }
        Ok(Self { owner, name })
    }

    /// Parse `owner/name`.
    pub fn parse(slug: &str) -> Result<Self, TypeError> {
        match slug.split_once('/') {
            Some((owner, name)) => Self::new(owner, name),
            None => Err(TypeError::InvalidRepository(format!(
                "expected 'owner/name', got '{}'",
                slug
            ))),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Kind of artifact published for a feed.
///
/// Parsing is case-insensitive. Anything outside the six recognized kinds
/// is rejected with [`UnsupportedArtifactKind`] rather than mapped to a
/// directory path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ArtifactKind {
    Json,
    Sql,
    Scripts,
    Metadata,
    Hql,
    Ddl,
}

impl ArtifactKind {
    /// All recognized kinds, in table order.
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Json,
        ArtifactKind::Sql,
        ArtifactKind::Scripts,
        ArtifactKind::Metadata,
        ArtifactKind::Hql,
        ArtifactKind::Ddl,
    ];

    /// Lowercase name as accepted on input.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Json => "json",
            ArtifactKind::Sql => "sql",
            ArtifactKind::Scripts => "scripts",
            ArtifactKind::Metadata => "metadata",
            ArtifactKind::Hql => "hql",
            ArtifactKind::Ddl => "ddl",
        }
    }

    /// Folder under the layout root that holds this kind.
    pub fn folder(&self) -> &'static str {
        match self {
            ArtifactKind::Json => "config/dci/json",
            ArtifactKind::Sql => "sql",
            ArtifactKind::Scripts => "scripts",
            ArtifactKind::Metadata => "metadata",
            ArtifactKind::Hql => "hql",
            ArtifactKind::Ddl => "ddl",
        }
    }

    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Json => "json",
            ArtifactKind::Sql => "sql",
            ArtifactKind::Scripts => "ksh",
            ArtifactKind::Metadata => "txt",
            ArtifactKind::Hql => "hql",
            ArtifactKind::Ddl => "ddl",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = UnsupportedArtifactKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| UnsupportedArtifactKind(s.to_string()))
    }
}

impl TryFrom<String> for ArtifactKind {
    type Error = UnsupportedArtifactKind;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ArtifactKind> for String {
    fn from(kind: ArtifactKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies what is being written and for which system of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorContext {
    sor: String,
    feed_name: String,
    kind: ArtifactKind,
}

impl SorContext {
    /// Create a validated context.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidSegment` if the SOR or feed name is not a
    /// single, non-empty path segment.
    pub fn new(
        sor: impl Into<String>,
        feed_name: impl Into<String>,
        kind: ArtifactKind,
    ) -> Result<Self, TypeError> {
        let sor = sor.into();
        let feed_name = feed_name.into();
        validate_segment("sor", &sor)?;
        validate_segment("feed name", &feed_name)?;
        Ok(Self {
            sor,
            feed_name,
            kind,
        })
    }

    pub fn sor(&self) -> &str {
        &self.sor
    }

    pub fn feed_name(&self) -> &str {
        &self.feed_name
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }
}

/// Check that a value can be used as exactly one repository path segment.
pub(crate) fn validate_segment(field: &'static str, value: &str) -> Result<(), TypeError> {
    let reason = if value.is_empty() {
        Some("cannot be empty".to_string())
    } else if value == "." || value == ".." {
        Some(format!("'{}' is not a directory name", value))
    } else if value.contains('/') || value.contains('\\') {
        Some(format!("'{}' cannot contain path separators", value))
    } else if value.chars().any(|c| c.is_control()) {
        Some("cannot contain control characters".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(TypeError::InvalidSegment { field, reason }),
        None => Ok(()),
    }
}

/// Directory convention used by a system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Type folders directly under `src/batch/{sor}/` (Type 1).
    FlatUnderSor,
    /// Per-feed folder under the SOR, then type folders (Type 2).
    NestedUnderFeed,
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" | "1" | "flat_under_sor" => Ok(LayoutKind::FlatUnderSor),
            "nested" | "2" | "nested_under_feed" => Ok(LayoutKind::NestedUnderFeed),
            other => Err(format!(
                "unknown layout '{}' (expected 'flat' or 'nested')",
                other
            )),
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutKind::FlatUnderSor => write!(f, "flat"),
            LayoutKind::NestedUnderFeed => write!(f, "nested"),
        }
    }
}

/// A node in the remote content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Final path component
    pub name: String,
    /// Repository-relative path
    pub path: String,
    /// Content hash, present for existing files
    pub sha: Option<String>,
    /// Whether this node is a directory
    pub is_directory: bool,
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let fail = |msg: &str| Err(TypeError::InvalidBranchName(msg.to_string()));

        if name.is_empty() {
            return fail("branch name cannot be empty");
        }
        if name == "@" {
            return fail("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return fail("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return fail("branch name cannot end with '.lock' or '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{}'",
                    bad
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return fail("branch name cannot contain control characters");
        }
        if name
            .split('/')
            .any(|component| component.starts_with('.') || component.ends_with(".lock"))
        {
            return fail("path component cannot start with '.' or end with '.lock'");
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fully qualified ref, e.g. `refs/heads/feature`.
    pub fn full_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
    pub head_sha: String,
}

/// Whether an upsert created a new file or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Created,
    Updated,
}

impl fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertAction::Created => write!(f, "created"),
            UpsertAction::Updated => write!(f, "updated"),
        }
    }
}

/// Outcome of a single file write.
///
/// `provider_response` is the provider's body, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertResult {
    pub action: UpsertAction,
    pub provider_response: serde_json::Value,
}
