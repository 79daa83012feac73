//! engine::layout
//!
//! Layout Resolver: decides whether a SOR follows the flat or the nested
//! directory convention by listing `src/batch/{sor}` on the default branch.
//!
//! | Listing result | Layout |
//! |---|---|
//! | contains a type folder (case-insensitive) | `FlatUnderSor` |
//! | empty, or no type folder | `NestedUnderFeed` |
//! | path does not exist | `NestedUnderFeed` |
//! | any other failure | `EngineError::LayoutResolution` |
//!
//! The result is never cached; every push lists again.

use tracing::{debug, info};

use super::EngineError;
use crate::auth::Credential;
use crate::core::paths::sor_root;
use crate::core::types::{validate_segment, ContentEntry, LayoutKind, RepositoryRef};
use crate::forge::{ContentApi, ForgeError};

/// Folder names that mark a SOR as flat.
pub const FLAT_LAYOUT_FOLDERS: [&str; 6] = ["config", "sql", "scripts", "metadata", "hql", "ddl"];

/// Classify a successful listing of a SOR directory.
pub fn classify_listing(entries: &[ContentEntry]) -> LayoutKind {
    let flat = entries.iter().any(|entry| {
        let name = entry.name.to_lowercase();
        FLAT_LAYOUT_FOLDERS.contains(&name.as_str())
    });
    if flat {
        LayoutKind::FlatUnderSor
    } else {
        LayoutKind::NestedUnderFeed
    }
}

/// Determine the layout used by `sor` in `repo`.
///
/// # Errors
///
/// - `InvalidRequest` if `sor` is not a single path segment
/// - `LayoutResolution` if the listing fails for any reason but absence
pub async fn resolve_layout(
    api: &dyn ContentApi,
    cred: &Credential,
    repo: &RepositoryRef,
    sor: &str,
) -> Result<LayoutKind, EngineError> {
    validate_segment("sor", sor)?;
    let root = sor_root(sor);

    let layout = match api.list_directory(cred, repo, &root).await {
        Ok(entries) => {
            let layout = classify_listing(&entries);
            debug!(%repo, sor, entries = entries.len(), %layout, "classified sor listing");
            layout
        }
        Err(ForgeError::NotFound(_)) => {
            debug!(%repo, sor, "sor directory absent, treating as new");
            LayoutKind::NestedUnderFeed
        }
        Err(source) => {
            return Err(EngineError::LayoutResolution {
                sor: sor.to_string(),
                source,
            })
        }
    };

    info!(%repo, sor, %layout, "resolved layout");
    Ok(layout)
}
