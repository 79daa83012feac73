//! Integration tests for the publishing engine.
//!
//! These run the public engine API end to end against MockForge, which
//! enforces the provider's sha rules for creates and updates.

use sorpush::auth::{Credential, StaticCredential};
use sorpush::core::types::{ArtifactKind, LayoutKind, RepositoryRef, SorContext, UpsertAction};
use sorpush::engine::{
    dispatch, ensure_branch, push_artifact, resolve_layout, ArtifactPush, BranchStatus,
    EngineError, Operation, OperationFailure, OperationOutcome,
};
use sorpush::forge::mock::{blob_sha, FailOn, MockForge, MockOperation};
use sorpush::forge::ForgeError;

fn cred() -> Credential {
    Credential::new("gho_integration").unwrap()
}

fn repo() -> RepositoryRef {
    RepositoryRef::new("octocat", "feeds").unwrap()
}

fn signed_in() -> StaticCredential {
    StaticCredential::new(Some(cred()))
}

/// sor1 uses the flat convention, sor2 the nested one.
fn seeded() -> MockForge {
    MockForge::new()
        .with_file("main", "src/batch/sor1/sql/existing.sql", "select 1;")
        .with_file("main", "src/batch/sor2/customers/config/dci/json/customers.json", "{}")
        .with_branch("feature/orders")
}

fn push(sor: &str, feed: &str, kind: ArtifactKind, content: &str) -> ArtifactPush {
    ArtifactPush {
        context: SorContext::new(sor, feed, kind).unwrap(),
        branch: "feature/orders".into(),
        content: content.as_bytes().to_vec(),
        message: None,
    }
}

fn put_shas(forge: &MockForge) -> Vec<Option<String>> {
    forge
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            MockOperation::PutFile { sha, .. } => Some(sha),
            _ => None,
        })
        .collect()
}

mod layout_resolution {
    use super::*;

    #[tokio::test]
    async fn flat_and_nested_sors() {
        let forge = seeded();
        assert_eq!(
            resolve_layout(&forge, &cred(), &repo(), "sor1").await.unwrap(),
            LayoutKind::FlatUnderSor
        );
        assert_eq!(
            resolve_layout(&forge, &cred(), &repo(), "sor2").await.unwrap(),
            LayoutKind::NestedUnderFeed
        );
    }

    #[tokio::test]
    async fn unknown_sor_is_nested() {
        let forge = seeded();
        assert_eq!(
            resolve_layout(&forge, &cred(), &repo(), "sor9").await.unwrap(),
            LayoutKind::NestedUnderFeed
        );
    }

    #[tokio::test]
    async fn type_folder_match_ignores_case() {
        let forge = MockForge::new().with_directory("src/batch/legacy/DDL");
        assert_eq!(
            resolve_layout(&forge, &cred(), &repo(), "legacy").await.unwrap(),
            LayoutKind::FlatUnderSor
        );
    }

    #[tokio::test]
    async fn listing_failure_is_reported_not_guessed() {
        let forge = seeded().fail_on(FailOn::ListDirectory(ForgeError::RemoteFailure {
            status: 500,
            message: "boom".into(),
        }));
        let err = resolve_layout(&forge, &cred(), &repo(), "sor1")
            .await
            .unwrap_err();
        match err {
            EngineError::LayoutResolution { sor, .. } => assert_eq!(sor, "sor1"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

mod publishing {
    use super::*;

    #[tokio::test]
    async fn flat_sor_gets_type_folder_directly_under_sor() {
        let forge = seeded();
        let outcome = push_artifact(
            &forge,
            &cred(),
            &repo(),
            push("sor1", "orders", ArtifactKind::Sql, "select * from orders;"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.layout, LayoutKind::FlatUnderSor);
        assert_eq!(outcome.path, "src/batch/sor1/sql/orders.sql");
        assert_eq!(outcome.result.action, UpsertAction::Created);
        assert_eq!(
            forge
                .file_content("feature/orders", "src/batch/sor1/sql/orders.sql")
                .unwrap(),
            b"select * from orders;"
        );
    }

    #[tokio::test]
    async fn nested_sor_gets_feed_folder() {
        let forge = seeded();
        let outcome = push_artifact(
            &forge,
            &cred(),
            &repo(),
            push("sor2", "orders", ArtifactKind::Json, "{\"a\":1}"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.layout, LayoutKind::NestedUnderFeed);
        assert_eq!(outcome.path, "src/batch/sor2/orders/config/dci/json/orders.json");
    }

    #[tokio::test]
    async fn second_push_updates_with_sha_of_first() {
        let forge = seeded();
        for content in ["v1", "v2"] {
            push_artifact(
                &forge,
                &cred(),
                &repo(),
                push("sor1", "orders", ArtifactKind::Ddl, content),
            )
            .await
            .unwrap();
        }

        assert_eq!(put_shas(&forge), vec![None, Some(blob_sha(b"v1"))]);
        assert_eq!(
            forge
                .file_content("feature/orders", "src/batch/sor1/ddl/orders.ddl")
                .unwrap(),
            b"v2"
        );
    }

    #[tokio::test]
    async fn every_push_lists_the_sor_again() {
        let forge = seeded();
        for _ in 0..2 {
            push_artifact(
                &forge,
                &cred(),
                &repo(),
                push("sor2", "orders", ArtifactKind::Hql, "select 1"),
            )
            .await
            .unwrap();
        }
        let listings = forge
            .operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::ListDirectory { .. }))
            .count();
        assert_eq!(listings, 2);
    }

    #[tokio::test]
    async fn write_conflict_is_terminal() {
        let forge = seeded().fail_on(FailOn::PutFile(ForgeError::Conflict(
            "sha does not match".into(),
        )));
        let err = push_artifact(
            &forge,
            &cred(),
            &repo(),
            push("sor1", "orders", ArtifactKind::Sql, "x"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "conflict");
        let writes = forge
            .operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::PutFile { .. }))
            .count();
        assert_eq!(writes, 1);
    }
}

mod branches {
    use super::*;

    #[tokio::test]
    async fn created_from_default_head_then_idempotent() {
        let forge = seeded().with_default_branch("develop");
        let develop_head = forge.branch_head("develop").unwrap();

        let first = ensure_branch(&forge, &cred(), &repo(), "release/1.0")
            .await
            .unwrap();
        assert_eq!(first.status, BranchStatus::Created);
        assert_eq!(first.branch.head_sha, develop_head);

        let second = ensure_branch(&forge, &cred(), &repo(), "release/1.0")
            .await
            .unwrap();
        assert_eq!(second.status, BranchStatus::AlreadyExisted);

        let creates = forge
            .operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::CreateRef { .. }))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn default_branch_failure_has_no_fallback() {
        let forge = seeded().fail_on(FailOn::DefaultBranch(ForgeError::Network(
            "timed out".into(),
        )));
        let err = ensure_branch(&forge, &cred(), &repo(), "fresh")
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(!forge.has_branch("fresh"));
    }
}

mod operations {
    use super::*;

    fn request(json: &str) -> Operation {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_makes_no_remote_call() {
        let forge = seeded();
        let op = request(
            r#"{"operation":"createBranch","owner":"octocat","repo":"feeds","branchName":"x"}"#,
        );
        let err = dispatch(&forge, &StaticCredential::anonymous(), op)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Unauthenticated));
        assert_eq!(OperationFailure::from(&err).kind, "unauthenticated");
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn push_file_request() {
        let forge = seeded();
        // "c2VsZWN0IDE7" is base64 for "select 1;"
        let op = request(
            r#"{"operation":"pushFile","owner":"octocat","repo":"feeds",
                "branch":"feature/orders","sor":"sor1","feedName":"orders",
                "artifactKind":"SQL","content":"c2VsZWN0\nIDE7"}"#,
        );
        let outcome = dispatch(&forge, &signed_in(), op).await.unwrap();

        match outcome {
            OperationOutcome::File {
                path,
                layout,
                action,
                ..
            } => {
                assert_eq!(path, "src/batch/sor1/sql/orders.sql");
                assert_eq!(layout, Some(LayoutKind::FlatUnderSor));
                assert_eq!(action, UpsertAction::Created);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            forge
                .file_content("feature/orders", "src/batch/sor1/sql/orders.sql")
                .unwrap(),
            b"select 1;"
        );
    }

    #[tokio::test]
    async fn unsupported_kind_fails_before_any_call() {
        let forge = seeded();
        let op = request(
            r#"{"operation":"pushFile","owner":"octocat","repo":"feeds","branch":"main",
                "sor":"sor1","feedName":"orders","artifactKind":"parquet","content":""}"#,
        );
        let err = dispatch(&forge, &signed_in(), op).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedArtifactKind(_)));
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn add_then_update_file() {
        let forge = seeded();
        let add = request(
            r#"{"operation":"addFile","owner":"octocat","repo":"feeds","branch":"main",
                "path":"docs/README.md","content":"aGk=","commitMessage":"add readme"}"#,
        );
        dispatch(&forge, &signed_in(), add).await.unwrap();

        let update = request(
            r#"{"operation":"updateFile","owner":"octocat","repo":"feeds","branch":"main",
                "path":"docs/README.md","content":"aGVsbG8=","commitMessage":"edit readme"}"#,
        );
        let outcome = dispatch(&forge, &signed_in(), update).await.unwrap();
        assert!(matches!(
            outcome,
            OperationOutcome::File {
                action: UpsertAction::Updated,
                ..
            }
        ));
        assert_eq!(forge.file_content("main", "docs/README.md").unwrap(), b"hello");
        assert_eq!(put_shas(&forge), vec![None, Some(blob_sha(b"hi"))]);
    }

    #[tokio::test]
    async fn adding_an_existing_file_conflicts() {
        let forge = seeded();
        let add = request(
            r#"{"operation":"addFile","owner":"octocat","repo":"feeds","branch":"main",
                "path":"src/batch/sor1/sql/existing.sql","content":"eA==","commitMessage":"dup"}"#,
        );
        let err = dispatch(&forge, &signed_in(), add).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn update_of_missing_file_without_upsert_is_not_found() {
        let forge = seeded();
        let update = request(
            r#"{"operation":"updateFile","owner":"octocat","repo":"feeds","branch":"main",
                "path":"missing.txt","content":"eA==","commitMessage":"edit"}"#,
        );
        let err = dispatch(&forge, &signed_in(), update).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");

        let upsert = request(
            r#"{"operation":"updateFile","owner":"octocat","repo":"feeds","branch":"main",
                "path":"missing.txt","content":"eA==","commitMessage":"edit","upsert":true}"#,
        );
        let outcome = dispatch(&forge, &signed_in(), upsert).await.unwrap();
        assert!(matches!(
            outcome,
            OperationOutcome::File {
                action: UpsertAction::Created,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn merge_reports_nothing_to_merge() {
        let forge = seeded();
        let op = request(
            r#"{"operation":"mergeBranch","owner":"octocat","repo":"feeds",
                "base":"main","head":"feature/orders"}"#,
        );
        let outcome = dispatch(&forge, &signed_in(), op).await.unwrap();
        assert_eq!(
            outcome,
            OperationOutcome::Merge {
                merged: false,
                provider_response: None
            }
        );
    }

    #[tokio::test]
    async fn merge_after_push_merges() {
        let forge = seeded();
        push_artifact(
            &forge,
            &cred(),
            &repo(),
            push("sor1", "orders", ArtifactKind::Sql, "select 2;"),
        )
        .await
        .unwrap();

        let op = request(
            r#"{"operation":"mergeBranch","owner":"octocat","repo":"feeds",
                "base":"main","head":"feature/orders","commitMessage":"ship"}"#,
        );
        let outcome = dispatch(&forge, &signed_in(), op).await.unwrap();
        assert!(matches!(outcome, OperationOutcome::Merge { merged: true, .. }));
        assert_eq!(
            forge
                .operations()
                .into_iter()
                .filter(|op| matches!(op, MockOperation::Merge { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn outcome_json_shape() {
        let outcome = OperationOutcome::Branch {
            name: "feature".into(),
            head_sha: "abc".into(),
            status: BranchStatus::Created,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "branch");
        assert_eq!(json["headSha"], "abc");
        assert_eq!(json["status"], "created");
    }
}
