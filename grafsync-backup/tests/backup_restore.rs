//! Backup an in-memory instance to disk, then restore it into an empty one.

use assert_fs::prelude::*;
use grafsync_backup::{backup, restore, BackupError, BackupOptions, RestoreOptions};
use grafsync_core::memory::{InMemoryGrafana, Operation};
use grafsync_core::{check_pristine, DashboardContent, GrafanaApi, FOLDER_GENERAL};
use predicates::prelude::*;
use serde_json::json;

async fn source() -> InMemoryGrafana {
    let store = InMemoryGrafana::new();
    // The child's uid sorts first, so files on disk are not parents-first.
    store.create_folder("Zeta", Some("zeta"), None).await.expect("zeta");
    store
        .create_folder("Alpha", Some("alpha"), Some("zeta"))
        .await
        .expect("alpha");
    store
        .update_dashboard(
            &DashboardContent::new("cpu", "CPU").with_field("refresh", json!("30s")),
            Some("alpha"),
        )
        .await
        .expect("cpu");
    store
        .update_dashboard(&DashboardContent::new("home", "Home"), None)
        .await
        .expect("home");
    store
}

// ---------------------------------------------------------------------------
// 1. Layout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn backup_writes_expected_layout() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let src = source().await;

    backup(&src, dir.path(), &BackupOptions::default())
        .await
        .expect("backup");

    dir.child("folders/zeta.json").assert(predicate::path::is_file());
    dir.child("folders/alpha.json")
        .assert(predicate::str::contains("\"parentUid\": \"zeta\""));
    dir.child("dashboards/cpu.json")
        .assert(predicate::str::contains("\"folderUid\": \"alpha\""));
    dir.child("dashboards/home.json").assert(predicate::path::is_file());
    dir.child("manifest.json")
        .assert(predicate::str::contains("backed_up_at").and(predicate::str::contains("cpu")));
    dir.child("folders/zeta.json.tmp").assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// 2. Round trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restore_recreates_tree_in_empty_instance() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let src = source().await;
    backup(&src, dir.path(), &BackupOptions::default())
        .await
        .expect("backup");

    let dst = InMemoryGrafana::new();
    let options = RestoreOptions {
        require_pristine: true,
    };
    let report = restore(&dst, dir.path(), &options).await.expect("restore");

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.folders_created, vec!["zeta", "alpha"]);
    assert_eq!(dst.folder_parent("alpha").as_deref(), Some("zeta"));
    assert_eq!(dst.dashboard_folder("cpu").as_deref(), Some("alpha"));
    assert_eq!(dst.dashboard_folder("home").as_deref(), Some(FOLDER_GENERAL));

    let want = src.get_dashboard("cpu").await.expect("src cpu");
    let got = dst.get_dashboard("cpu").await.expect("dst cpu");
    assert!(got.dashboard.content_eq(&want.dashboard));
}

#[tokio::test]
async fn restore_over_existing_content_updates_in_place() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let src = source().await;
    backup(&src, dir.path(), &BackupOptions::default())
        .await
        .expect("backup");

    let dst = InMemoryGrafana::new();
    dst.create_folder("Old name", Some("zeta"), None)
        .await
        .expect("zeta");
    let report = restore(&dst, dir.path(), &RestoreOptions::default())
        .await
        .expect("restore");

    assert_eq!(report.folders_updated, vec!["zeta"]);
    assert_eq!(report.folders_created, vec!["alpha"]);
    assert_eq!(dst.get_folder("zeta").await.expect("zeta").title, "Zeta");
}

#[tokio::test]
async fn dashboard_failures_are_recorded_and_restore_continues() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let src = source().await;
    backup(&src, dir.path(), &BackupOptions::default())
        .await
        .expect("backup");

    let dst = InMemoryGrafana::new();
    dst.fail_on(Operation::WriteDashboard, "cpu");
    let report = restore(&dst, dir.path(), &RestoreOptions::default())
        .await
        .expect("restore");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].uid, "cpu");
    assert_eq!(report.dashboards_restored, vec!["home"]);
}

#[tokio::test]
async fn corrupt_backup_file_aborts() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("folders").create_dir_all().expect("mkdir");
    dir.child("folders/broken.json")
        .write_str("{ not json")
        .expect("write");

    let dst = InMemoryGrafana::new();
    let err = restore(&dst, dir.path(), &RestoreOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BackupError::Json { .. }), "got: {err}");
    assert!(err.to_string().contains("broken.json"));
    check_pristine(&dst).await.expect("nothing restored");
}
