//! Property-based tests for path routing and layout classification.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use sorpush::core::paths::{build_path, sor_root, BATCH_ROOT};
use sorpush::core::types::{ArtifactKind, BranchName, ContentEntry, LayoutKind, SorContext};
use sorpush::engine::{classify_listing, FLAT_LAYOUT_FOLDERS};

/// Strategy for a single path segment (SOR or feed name).
fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_][A-Za-z0-9_.-]{0,20}".prop_filter("not a relative segment", |s| {
        s != "." && s != ".."
    })
}

fn kind() -> impl Strategy<Value = ArtifactKind> {
    prop::sample::select(ArtifactKind::ALL.to_vec())
}

fn layout() -> impl Strategy<Value = LayoutKind> {
    prop_oneof![Just(LayoutKind::FlatUnderSor), Just(LayoutKind::NestedUnderFeed)]
}

fn dir(name: &str) -> ContentEntry {
    ContentEntry {
        name: name.to_string(),
        path: format!("src/batch/s/{}", name),
        sha: None,
        is_directory: true,
    }
}

/// Random-case spelling of a flat-layout folder name.
fn flat_folder() -> impl Strategy<Value = String> {
    (prop::sample::select(FLAT_LAYOUT_FOLDERS.to_vec()), any::<u64>()).prop_map(|(name, bits)| {
        name.chars()
            .enumerate()
            .map(|(i, c)| {
                if bits >> (i % 64) & 1 == 1 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect()
    })
}

/// Folder names that never mark a SOR as flat.
fn other_folder() -> impl Strategy<Value = String> {
    segment().prop_filter("not a flat folder", |s| {
        !FLAT_LAYOUT_FOLDERS.contains(&s.to_lowercase().as_str())
    })
}

proptest! {
    #[test]
    fn path_is_deterministic(sor in segment(), feed in segment(), kind in kind(), layout in layout()) {
        let ctx = SorContext::new(sor.as_str(), feed.as_str(), kind).unwrap();
        prop_assert_eq!(build_path(&ctx, layout), build_path(&ctx.clone(), layout));
    }

    #[test]
    fn path_stays_under_sor_root(sor in segment(), feed in segment(), kind in kind(), layout in layout()) {
        let ctx = SorContext::new(sor.as_str(), feed.as_str(), kind).unwrap();
        let path = build_path(&ctx, layout);
        let root = format!("{}/", sor_root(&sor));
        prop_assert!(path.starts_with(BATCH_ROOT));
        prop_assert!(path.starts_with(&root));
        let expected_suffix = format!("{}.{}", feed, kind.extension());
        prop_assert!(path.ends_with(&expected_suffix));
        prop_assert!(!path.contains("//"));
    }

    #[test]
    fn nested_path_only_adds_feed_folder(sor in segment(), feed in segment(), kind in kind()) {
        let ctx = SorContext::new(sor.as_str(), feed.as_str(), kind).unwrap();
        let flat = build_path(&ctx, LayoutKind::FlatUnderSor);
        let nested = build_path(&ctx, LayoutKind::NestedUnderFeed);

        let root = format!("{}/", sor_root(&sor));
        let flat_rest = flat.strip_prefix(&root).unwrap();
        let nested_rest = nested.strip_prefix(&root).unwrap();
        prop_assert_eq!(nested_rest.to_string(), format!("{}/{}", feed, flat_rest));
    }

    #[test]
    fn any_flat_folder_makes_listing_flat(
        others in prop::collection::vec(other_folder(), 0..6),
        flat in flat_folder(),
        position in any::<prop::sample::Index>(),
    ) {
        let mut entries: Vec<ContentEntry> = others.iter().map(|n| dir(n)).collect();
        let at = position.index(entries.len() + 1);
        entries.insert(at, dir(&flat));
        prop_assert_eq!(classify_listing(&entries), LayoutKind::FlatUnderSor);
    }

    #[test]
    fn listing_without_flat_folder_is_nested(
        others in prop::collection::vec(other_folder(), 0..8),
    ) {
        let entries: Vec<ContentEntry> = others.iter().map(|n| dir(n)).collect();
        prop_assert_eq!(classify_listing(&entries), LayoutKind::NestedUnderFeed);
    }

    #[test]
    fn separators_are_rejected_in_segments(left in segment(), right in segment(), kind in kind()) {
        let joined = format!("{}/{}", left, right);
        prop_assert!(SorContext::new(joined.as_str(), "feed", kind).is_err());
        prop_assert!(SorContext::new("sor", joined.as_str(), kind).is_err());
    }

    #[test]
    fn branch_names_with_double_dot_are_rejected(left in "[a-z]{1,10}", right in "[a-z]{1,10}") {
        let name = format!("{}..{}", left, right);
        prop_assert!(BranchName::new(name).is_err());
    }
}
