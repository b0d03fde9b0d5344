#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use chrono::{TimeDelta, Utc};
use common::*;
use neonsync::{git::GitRef, neon::Branch, workflows::init_new_feature};

fn project() -> MockProvider {
    MockProvider::with_branches(vec![Branch {
        default: true,
        ..branch("p1", "production")
    }])
}

#[tokio::test]
async fn test_init_creates_branch_from_production() {
    let harness = Harness::new(project(), FakeVcs::on("main", &["main"]))
        .with_env_file("DATABASE_URL=\"postgresql://old@host/db\"\nNEON_PROJECT_ID=proj\n");

    let before = Utc::now();
    let summary = init_new_feature::run(&harness.context(), Some("team/x"))
        .await
        .unwrap();

    let created = harness.provider.created();
    assert_eq!(created.len(), 1);
    let request = &created[0];
    assert_eq!(request.parent_id, "p1");
    assert_eq!(request.name, "team-x");
    assert!(request.pooled);

    let expected = before + TimeDelta::days(14);
    let drift = (request.expires_at - expected).num_milliseconds().abs();
    assert!(drift <= 1000, "expiry off by {drift}ms");

    let database_url = harness.env_value("DATABASE_URL").unwrap();
    assert!(database_url.contains(NEW_POOLER_HOST), "{database_url}");
    assert_eq!(
        harness.env_value("ORIGINAL_DATABASE_URL").as_deref(),
        Some("postgresql://old@host/db")
    );
    assert!(harness.env_text().contains("NEON_PROJECT_ID=proj\n"));

    assert_eq!(harness.vcs.current(), GitRef::Branch("team/x".into()));
    assert_eq!(summary.get("Neon branch"), Some("team-x"));
    assert_eq!(summary.get("Parent"), Some("production"));
    assert_eq!(summary.get("DATABASE_URL"), Some("updated"));
}

#[tokio::test]
async fn test_init_checks_out_base_before_branching() {
    let harness = Harness::new(project(), FakeVcs::on("other", &["main", "other"]));

    init_new_feature::run(&harness.context(), Some("feature-y"))
        .await
        .unwrap();

    assert_eq!(
        harness.vcs.log(),
        vec!["checkout main", "pull", "checkout -b feature-y main"]
    );
}

#[tokio::test]
async fn test_init_falls_back_to_master() {
    let harness = Harness::new(project(), FakeVcs::on("master", &["master"]));

    init_new_feature::run(&harness.context(), Some("feature-y"))
        .await
        .unwrap();

    assert!(
        harness
            .vcs
            .log()
            .contains(&"checkout -b feature-y master".to_string())
    );
}

#[tokio::test]
async fn test_init_pull_failure_is_not_fatal() {
    let mut vcs = FakeVcs::on("main", &["main"]);
    vcs.has_remote = false;
    let harness = Harness::new(project(), vcs);

    assert!(
        init_new_feature::run(&harness.context(), Some("feature-y"))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_init_uses_current_branch() {
    let harness = Harness::new(project(), FakeVcs::on("feature/login", &["main", "feature/login"]));

    init_new_feature::run(&harness.context(), None).await.unwrap();

    assert!(harness.vcs.log().is_empty());
    assert_eq!(harness.provider.created()[0].name, "feature-login");
}

#[tokio::test]
async fn test_init_refuses_protected_branch() {
    let harness = Harness::new(project(), FakeVcs::on("main", &["main"]));

    let err = init_new_feature::run(&harness.context(), Some("develop"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("protected"), "{err}");
    assert!(harness.provider.calls().is_empty());
    assert!(harness.vcs.log().is_empty());
}

#[tokio::test]
async fn test_init_without_name_on_protected_branch() {
    let harness = Harness::new(project(), FakeVcs::on("main", &["main"]));

    let err = init_new_feature::run(&harness.context(), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("init-new-feature <branch-name>"), "{err}");
    assert!(harness.provider.calls().is_empty());
}

#[tokio::test]
async fn test_init_outside_repository() {
    let mut vcs = FakeVcs::on("main", &["main"]);
    vcs.repository = false;
    let harness = Harness::new(project(), vcs);

    assert!(
        init_new_feature::run(&harness.context(), Some("feature-y"))
            .await
            .is_err()
    );
    assert!(harness.provider.calls().is_empty());
}

#[tokio::test]
async fn test_init_without_production_branch() {
    let provider = MockProvider::with_branches(vec![branch("b1", "staging")]);
    let harness = Harness::new(provider, FakeVcs::on("main", &["main"]));

    let err = init_new_feature::run(&harness.context(), Some("feature-y"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no production branch"), "{err}");
    assert!(harness.provider.created().is_empty());
}

#[tokio::test]
async fn test_init_reuses_existing_neon_branch() {
    let provider = MockProvider::with_branches(vec![
        branch("p1", "production"),
        child("b2", "feature-y", "p1"),
    ]);
    let harness = Harness::new(provider, FakeVcs::on("main", &["main"]));

    let summary = init_new_feature::run(&harness.context(), Some("feature-y"))
        .await
        .unwrap();

    assert!(harness.provider.created().is_empty());
    assert_eq!(summary.get("Branch ID"), Some("b2"));
    assert_eq!(
        harness.env_value("DATABASE_URL"),
        Some(uri_for("b2"))
    );
}

#[tokio::test]
async fn test_init_manual_mode_leaves_env_file_alone() {
    let harness = Harness::new(project(), FakeVcs::on("main", &["main"]))
        .with_env_file("DATABASE_URL=postgresql://old@host/db\n")
        .manual();

    let summary = init_new_feature::run(&harness.context(), Some("feature-y"))
        .await
        .unwrap();

    assert_eq!(harness.env_text(), "DATABASE_URL=postgresql://old@host/db\n");
    assert_eq!(summary.get("DATABASE_URL"), Some("not changed (manual mode)"));
    assert_eq!(harness.provider.created().len(), 1);
}

#[tokio::test]
async fn test_init_env_write_failure_is_a_warning() {
    let harness =
        Harness::new(project(), FakeVcs::on("main", &["main"])).with_env_file_blocked();

    let summary = init_new_feature::run(&harness.context(), Some("team/x"))
        .await
        .unwrap();

    assert_eq!(harness.provider.created().len(), 1);
    assert_eq!(summary.get("DATABASE_URL"), Some("not changed (write failed)"));
    assert!(harness.workspace.env_file.is_dir());
}
