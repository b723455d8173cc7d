//! Sync entrypoint used by the CLI.

use grafsync_core::{general_or, is_general, GrafanaApi, ObjectKind, FOLDER_GENERAL};

use crate::dashboards::DashboardReconciler;
use crate::folders::FolderReconciler;
use crate::prune::SyncRunState;
use crate::report::{Step, SyncReport};
use crate::walk::TreeWalker;
use crate::SyncError;

/// What a [`sync`] run covers and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Source folder to sync from; `general` syncs everything.
    pub folder_uid: String,
    pub recursive: bool,
    pub include_dashboards: bool,
    /// Delete destination dashboards under the folder that the source lacks.
    pub prune: bool,
    pub relocate_folders: bool,
    pub relocate_dashboards: bool,
    /// Destination folder that receives the source's top-level content.
    pub dst_parent_uid: Option<String>,
    /// Read everything, write nothing; the report lists planned actions.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            folder_uid: FOLDER_GENERAL.to_string(),
            recursive: true,
            include_dashboards: true,
            prune: false,
            relocate_folders: true,
            relocate_dashboards: true,
            dst_parent_uid: None,
            dry_run: false,
        }
    }
}

/// Make the destination match the source under `options.folder_uid`.
///
/// Only a missing destination parent aborts the run, and it does so before
/// any mutation. Every other failure lands in the returned report.
pub async fn sync(
    src: &dyn GrafanaApi,
    dst: &dyn GrafanaApi,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let folder_uid = general_or(Some(&options.folder_uid));
    let dst_parent_uid = options
        .dst_parent_uid
        .as_deref()
        .filter(|uid| !is_general(Some(*uid)));

    if let Some(uid) = dst_parent_uid {
        match dst.get_folder(uid).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                return Err(SyncError::DestinationParentNotFound {
                    uid: uid.to_owned(),
                    source: err,
                })
            }
            Err(err) => return Err(SyncError::Api(err)),
        }
    }

    tracing::info!(
        "syncing folder '{folder_uid}' (recursive: {}, dashboards: {}, dry run: {})",
        options.recursive,
        options.include_dashboards,
        options.dry_run
    );
    let mut report = SyncReport::new(options.dry_run);
    let mut folders = FolderReconciler::new(src, dst, dst_parent_uid, options.dry_run);
    let dashboards = DashboardReconciler::new(src, dst, dst_parent_uid, options.dry_run);

    let pruning = options.include_dashboards && options.prune;
    let mut run_state = if pruning {
        // Source root content lands under the destination parent.
        let scope = dashboards.resolve_target(folder_uid);
        SyncRunState::snapshot(dst, scope, &mut report).await
    } else {
        SyncRunState::default()
    };

    if !is_general(Some(folder_uid)) {
        folders.reconcile(folder_uid, false, &mut report).await;
    }

    let mut walker = TreeWalker::new(
        src,
        folder_uid,
        options.recursive,
        options.include_dashboards,
    );
    let mut walk_failed = false;
    while let Some(node) = walker.next().await {
        let node = match node {
            Ok(node) => node,
            Err(err) => {
                tracing::error!("{err}");
                walk_failed = true;
                report.fail(ObjectKind::Folder, &err.folder_uid, Step::ListSource, &err.source);
                continue;
            }
        };
        for folder in &node.folders {
            folders.reconcile(&folder.uid, true, &mut report).await;
        }
        for dashboard in &node.dashboards {
            let synced = dashboards
                .reconcile(
                    &dashboard.uid,
                    &node.folder_uid,
                    options.relocate_dashboards,
                    &mut report,
                )
                .await;
            if synced {
                run_state.mark_synced(&dashboard.uid);
            }
        }
    }

    if options.relocate_folders {
        folders.apply_relocations(&mut report).await;
    } else {
        let skipped = folders.discard_relocations();
        if skipped > 0 {
            tracing::warn!("skipping folder relocation (disabled), {skipped} folder(s) left in place");
        }
    }

    // Dashboards under an unlisted source folder would all look deleted.
    if pruning && walk_failed {
        tracing::warn!(
            "skipping prune: source listing failed, {} candidate(s) left in place",
            run_state.candidates().len()
        );
        report.prune_skipped = true;
    } else if pruning {
        run_state.apply(dst, options.dry_run, &mut report).await;
    }

    let counts = report.counts();
    tracing::info!(
        "sync finished: {} folder(s) created, {} moved, {} dashboard(s) written, {} unchanged, {} deleted, {} failure(s)",
        counts.folders_created,
        counts.folders_moved,
        counts.dashboards_written,
        counts.dashboards_unchanged,
        counts.dashboards_deleted,
        counts.failures
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use grafsync_core::memory::{InMemoryGrafana, Operation};
    use grafsync_core::DashboardContent;

    use super::*;

    #[test]
    fn default_options_sync_everything() {
        let options = SyncOptions::default();
        assert_eq!(options.folder_uid, FOLDER_GENERAL);
        assert!(options.recursive && options.include_dashboards);
        assert!(options.relocate_folders && options.relocate_dashboards);
        assert!(!options.prune && !options.dry_run);
        assert_eq!(options.dst_parent_uid, None);
    }

    #[tokio::test]
    async fn missing_destination_parent_aborts_before_mutating() {
        let src = InMemoryGrafana::new();
        let dst = InMemoryGrafana::new();
        src.create_folder("A", Some("a"), None).await.expect("folder");

        let options = SyncOptions {
            dst_parent_uid: Some("nope".into()),
            ..SyncOptions::default()
        };
        let err = sync(&src, &dst, &options).await.expect_err("must fail");
        assert!(matches!(err, SyncError::DestinationParentNotFound { ref uid, .. } if uid == "nope"));
        assert!(dst.mutations().is_empty());
    }

    #[tokio::test]
    async fn general_as_destination_parent_means_root() {
        let src = InMemoryGrafana::new();
        let dst = InMemoryGrafana::new();
        src.create_folder("A", Some("a"), None).await.expect("folder");

        let options = SyncOptions {
            dst_parent_uid: Some(FOLDER_GENERAL.into()),
            ..SyncOptions::default()
        };
        let report = sync(&src, &dst, &options).await.expect("sync");
        assert!(report.is_converged());
        assert_eq!(dst.folder_parent("a").as_deref(), Some(FOLDER_GENERAL));
    }

    #[tokio::test]
    async fn unlistable_source_folder_is_recorded() {
        let src = InMemoryGrafana::new();
        let dst = InMemoryGrafana::new();
        src.create_folder("A", Some("a"), None).await.expect("folder");
        src.update_dashboard(&DashboardContent::new("d", "D"), Some("a"))
            .await
            .expect("dashboard");
        src.fail_on(Operation::SearchDashboards, "a");

        let report = sync(&src, &dst, &SyncOptions::default()).await.expect("sync");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, Step::ListSource);
        assert_eq!(dst.folder_count(), 1);
        assert_eq!(dst.dashboard_count(), 0);
    }
}
