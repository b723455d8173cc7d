//! Dashboard reconciliation: canonical content compare, then write or skip.

use grafsync_core::{general_or, is_general, none_if_general, GrafanaApi, ObjectKind};

use crate::report::{Step, SyncAction, SyncReport};

pub struct DashboardReconciler<'a> {
    src: &'a dyn GrafanaApi,
    dst: &'a dyn GrafanaApi,
    dst_parent_uid: Option<String>,
    dry_run: bool,
}

impl<'a> DashboardReconciler<'a> {
    pub fn new(
        src: &'a dyn GrafanaApi,
        dst: &'a dyn GrafanaApi,
        dst_parent_uid: Option<&str>,
        dry_run: bool,
    ) -> Self {
        Self {
            src,
            dst,
            dst_parent_uid: none_if_general(dst_parent_uid).map(str::to_owned),
            dry_run,
        }
    }

    /// Destination folder for a dashboard living in `src_folder_uid` at the
    /// source: the same folder, except that the root maps to the
    /// destination parent.
    pub fn resolve_target<'b>(&'b self, src_folder_uid: &'b str) -> &'b str {
        if is_general(Some(src_folder_uid)) {
            general_or(self.dst_parent_uid.as_deref())
        } else {
            src_folder_uid
        }
    }

    /// Bring one dashboard in line with the source.
    ///
    /// Returns `true` when the destination now holds the source content
    /// (written or already equal); failures are recorded and yield `false`.
    pub async fn reconcile(
        &self,
        dashboard_uid: &str,
        target_folder_uid: &str,
        relocate: bool,
        report: &mut SyncReport,
    ) -> bool {
        let src = match self.src.get_dashboard(dashboard_uid).await {
            Ok(dashboard) => dashboard,
            Err(err) => {
                if err.is_not_found() {
                    tracing::warn!("Dashboard '{dashboard_uid}' vanished from source, skipping");
                } else {
                    tracing::error!("Failed to read source dashboard '{dashboard_uid}': {err}");
                }
                report.fail(ObjectKind::Dashboard, dashboard_uid, Step::ReadSource, &err);
                return false;
            }
        };
        let title = src.dashboard.title.as_str();
        let wanted_folder = self.resolve_target(target_folder_uid).to_owned();

        let current_folder = match self.dst.get_dashboard(dashboard_uid).await {
            Ok(dst) => {
                let dst_folder = dst.folder_uid().to_owned();
                if src.dashboard.content_eq(&dst.dashboard)
                    && (!relocate || dst_folder == wanted_folder)
                {
                    tracing::info!(
                        "Dashboard '{title}' (uid: {dashboard_uid}) is identical, skipping update"
                    );
                    report.record(SyncAction::DashboardUnchanged {
                        uid: dashboard_uid.to_owned(),
                    });
                    return true;
                }
                Some(dst_folder)
            }
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                tracing::debug!("could not read destination dashboard '{dashboard_uid}': {err}");
                None
            }
        };

        let folder_uid = match current_folder {
            Some(current) if !relocate => current,
            _ => wanted_folder,
        };

        if self.dry_run {
            tracing::info!("[dry-run] would sync dashboard '{title}' to folder '{folder_uid}'");
        } else {
            let content = src.dashboard.without_id();
            if let Err(err) = self
                .dst
                .update_dashboard(&content, none_if_general(Some(&folder_uid)))
                .await
            {
                tracing::error!("Failed to sync dashboard '{title}' (uid: {dashboard_uid}): {err}");
                report.fail(ObjectKind::Dashboard, dashboard_uid, Step::WriteDashboard, &err);
                return false;
            }
            tracing::info!("Synced dashboard '{title}' (uid: {dashboard_uid}) to folder '{folder_uid}'");
        }
        report.record(SyncAction::DashboardWritten {
            uid: dashboard_uid.to_owned(),
            folder_uid,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grafsync_core::memory::{InMemoryGrafana, Mutation, Operation};
    use grafsync_core::{DashboardContent, FOLDER_GENERAL};
    use rstest::rstest;
    use serde_json::json;

    async fn seed(store: &InMemoryGrafana, uid: &str, folder: Option<&str>, refresh: &str) {
        let content = DashboardContent::new(uid, format!("Dashboard {uid}"))
            .with_field("refresh", json!(refresh));
        store.update_dashboard(&content, folder).await.unwrap();
    }

    async fn stores() -> (InMemoryGrafana, InMemoryGrafana) {
        let src = InMemoryGrafana::new();
        let dst = InMemoryGrafana::new();
        for store in [&src, &dst] {
            store.create_folder("A", Some("a"), None).await.unwrap();
            store.create_folder("B", Some("b"), None).await.unwrap();
        }
        (src, dst)
    }

    #[tokio::test]
    async fn missing_dashboard_is_created_in_source_folder() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("a"), "5s").await;

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(dashboards.reconcile("d", "a", true, &mut report).await);

        assert_eq!(dst.dashboard_folder("d").as_deref(), Some("a"));
        let written = dst.get_dashboard("d").await.unwrap();
        assert!(written.dashboard.content_eq(&src.get_dashboard("d").await.unwrap().dashboard));
    }

    #[tokio::test]
    async fn equal_content_in_same_folder_is_skipped() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("a"), "5s").await;
        // Different server bookkeeping on each side.
        seed(&dst, "d", Some("a"), "5s").await;
        seed(&dst, "d", Some("a"), "5s").await;
        dst.clear_mutations();

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(dashboards.reconcile("d", "a", true, &mut report).await);
        assert!(dst.mutations().is_empty());
        assert_eq!(report.counts().dashboards_unchanged, 1);
    }

    #[tokio::test]
    async fn changed_content_is_written() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("a"), "10s").await;
        seed(&dst, "d", Some("a"), "5s").await;
        dst.clear_mutations();

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(dashboards.reconcile("d", "a", true, &mut report).await);
        assert_eq!(dst.mutations(), vec![Mutation::WriteDashboard("d".into())]);
        let written = dst.get_dashboard("d").await.unwrap();
        assert_eq!(written.dashboard.fields["refresh"], json!("10s"));
    }

    #[tokio::test]
    async fn relocation_follows_source_folder() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("b"), "5s").await;
        seed(&dst, "d", Some("a"), "5s").await;

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(dashboards.reconcile("d", "b", true, &mut report).await);
        assert_eq!(dst.dashboard_folder("d").as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn without_relocation_destination_folder_is_kept() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("b"), "10s").await;
        seed(&dst, "d", Some("a"), "5s").await;
        dst.clear_mutations();

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(dashboards.reconcile("d", "b", false, &mut report).await);
        assert_eq!(dst.dashboard_folder("d").as_deref(), Some("a"));
        assert_eq!(dst.dashboard_writes(), 1);

        // Same content, different folder, no relocation: nothing to do.
        dst.clear_mutations();
        assert!(dashboards.reconcile("d", "b", false, &mut report).await);
        assert!(dst.mutations().is_empty());
    }

    #[tokio::test]
    async fn root_dashboards_go_under_destination_parent() {
        let (src, dst) = stores().await;
        seed(&src, "d", None, "5s").await;

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, Some("b"), false);
        assert_eq!(dashboards.resolve_target(FOLDER_GENERAL), "b");
        assert!(dashboards.reconcile("d", FOLDER_GENERAL, true, &mut report).await);
        assert_eq!(dst.dashboard_folder("d").as_deref(), Some("b"));

        dst.clear_mutations();
        assert!(dashboards.reconcile("d", FOLDER_GENERAL, true, &mut report).await);
        assert!(dst.mutations().is_empty());
    }

    #[tokio::test]
    async fn vanished_source_dashboard_is_a_recorded_skip() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("a"), "5s").await;
        src.fail_on(Operation::GetDashboard, "d");

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(!dashboards.reconcile("d", "a", true, &mut report).await);
        assert_eq!(dst.dashboard_count(), 0);
        assert_eq!(report.failures[0].step, Step::ReadSource);
    }

    #[tokio::test]
    async fn unreadable_destination_dashboard_is_still_written() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("a"), "10s").await;
        seed(&dst, "d", Some("b"), "5s").await;
        dst.clear_mutations();
        dst.fail_with_status(Operation::GetDashboard, "d", 500);

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(dashboards.reconcile("d", "a", false, &mut report).await);

        assert_eq!(dst.mutations(), vec![Mutation::WriteDashboard("d".into())]);
        assert!(report.is_converged());
        // Unknown current folder: the source folder wins even without relocation.
        assert_eq!(dst.dashboard_folder("d").as_deref(), Some("a"));
    }

    #[rstest]
    #[case::same_content_same_folder(true, true, true, false)]
    #[case::same_content_same_folder_no_relocate(true, true, false, false)]
    #[case::same_content_moved(true, false, true, true)]
    #[case::same_content_moved_no_relocate(true, false, false, false)]
    #[case::changed_content(false, true, true, true)]
    #[case::changed_content_no_relocate(false, true, false, true)]
    #[case::changed_content_moved(false, false, true, true)]
    #[case::changed_content_moved_no_relocate(false, false, false, true)]
    #[tokio::test]
    async fn write_decision(
        #[case] same_content: bool,
        #[case] same_folder: bool,
        #[case] relocate: bool,
        #[case] writes: bool,
    ) {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("a"), "5s").await;
        let dst_folder = if same_folder { "a" } else { "b" };
        let refresh = if same_content { "5s" } else { "1m" };
        seed(&dst, "d", Some(dst_folder), refresh).await;
        dst.clear_mutations();

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(dashboards.reconcile("d", "a", relocate, &mut report).await);

        assert_eq!(dst.dashboard_writes(), usize::from(writes));
        let expected_folder = if relocate { "a" } else { dst_folder };
        assert_eq!(dst.dashboard_folder("d").as_deref(), Some(expected_folder));
    }

    #[tokio::test]
    async fn write_failure_returns_false() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("a"), "5s").await;
        dst.fail_on(Operation::WriteDashboard, "d");

        let mut report = SyncReport::default();
        let dashboards = DashboardReconciler::new(&src, &dst, None, false);
        assert!(!dashboards.reconcile("d", "a", true, &mut report).await);
        assert_eq!(report.failures[0].step, Step::WriteDashboard);
    }

    #[tokio::test]
    async fn dry_run_reports_without_writing() {
        let (src, dst) = stores().await;
        seed(&src, "d", Some("a"), "5s").await;

        let mut report = SyncReport::new(true);
        let dashboards = DashboardReconciler::new(&src, &dst, None, true);
        assert!(dashboards.reconcile("d", "a", true, &mut report).await);
        assert_eq!(dst.dashboard_count(), 0);
        assert_eq!(report.dashboard_writes(), 1);
    }
}
