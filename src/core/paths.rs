//! core::paths
//!
//! Destination path routing for feed artifacts.
//!
//! # Layouts
//!
//! Every SOR lives under `src/batch/{sor}/`. Below that, one of two
//! conventions applies:
//!
//! - **Flat** (Type 1): type folders directly under the SOR
//!   (`src/batch/{sor}/sql/{feed}.sql`)
//! - **Nested** (Type 2): a folder per feed, then type folders
//!   (`src/batch/{sor}/{feed}/sql/{feed}.sql`)
//!
//! Path building never touches the network: the result is a pure
//! function of the layout and the [`SorContext`].
//!
//! # Example
//!
//! ```
//! use sorpush::core::paths::build_path;
//! use sorpush::core::types::{ArtifactKind, LayoutKind, SorContext};
//!
//! let ctx = SorContext::new("sor2", "orders", ArtifactKind::Json).unwrap();
//! assert_eq!(
//!     build_path(&ctx, LayoutKind::NestedUnderFeed),
//!     "src/batch/sor2/orders/config/dci/json/orders.json"
//! );
//! ```

use super::types::{LayoutKind, SorContext};

/// Repository directory that holds every SOR.
pub const BATCH_ROOT: &str = "src/batch";

/// Root directory for a SOR: `src/batch/{sor}`.
pub fn sor_root(sor: &str) -> String {
    format!("{}/{}", BATCH_ROOT, sor)
}

/// Directory under which type folders live for the given layout.
pub fn layout_root(ctx: &SorContext, layout: LayoutKind) -> String {
    match layout {
        LayoutKind::FlatUnderSor => sor_root(ctx.sor()),
        LayoutKind::NestedUnderFeed => format!("{}/{}", sor_root(ctx.sor()), ctx.feed_name()),
    }
}

/// Repository-relative destination path for an artifact.
pub fn build_path(ctx: &SorContext, layout: LayoutKind) -> String {
    let kind = ctx.kind();
    format!(
        "{}/{}/{}.{}",
        layout_root(ctx, layout),
        kind.folder(),
        ctx.feed_name(),
        kind.extension()
    )
}
