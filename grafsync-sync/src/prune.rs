//! Prune by difference: what the destination had before the run, minus what
//! the run synced from the source.

use std::collections::HashSet;

use grafsync_core::{GrafanaApi, ObjectKind};

use crate::report::{Step, SyncAction, SyncReport};
use crate::walk::collect_dashboard_uids;

/// Dashboard uid sets of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRunState {
    pub dst_dashboard_uids_before: HashSet<String>,
    pub src_dashboard_uids_synced: HashSet<String>,
}

impl SyncRunState {
    /// Inventory every destination dashboard under `folder_uid`, at any depth.
    ///
    /// Folders that fail to list are recorded; their dashboards are then
    /// invisible to pruning and survive the run.
    pub async fn snapshot(dst: &dyn GrafanaApi, folder_uid: &str, report: &mut SyncReport) -> Self {
        let (uids, errors) = collect_dashboard_uids(dst, folder_uid).await;
        for err in errors {
            tracing::error!("Failed to inventory destination: {err}");
            report.fail(
                ObjectKind::Folder,
                &err.folder_uid,
                Step::InventoryDestination,
                &err.source,
            );
        }
        tracing::debug!("{} destination dashboard(s) before sync", uids.len());
        Self {
            dst_dashboard_uids_before: uids,
            src_dashboard_uids_synced: HashSet::new(),
        }
    }

    pub fn mark_synced(&mut self, dashboard_uid: &str) {
        self.src_dashboard_uids_synced
            .insert(dashboard_uid.to_owned());
    }

    /// Destination uids with no synced source counterpart, sorted.
    pub fn candidates(&self) -> Vec<String> {
        let mut uids: Vec<String> = self
            .dst_dashboard_uids_before
            .difference(&self.src_dashboard_uids_synced)
            .cloned()
            .collect();
        uids.sort();
        uids
    }

    /// Delete every candidate; a failed delete does not stop the others.
    pub async fn apply(&self, dst: &dyn GrafanaApi, dry_run: bool, report: &mut SyncReport) {
        for uid in self.candidates() {
            if dry_run {
                tracing::info!("[dry-run] would delete dashboard '{uid}'");
            } else if let Err(err) = dst.delete_dashboard(&uid).await {
                tracing::error!("Failed to delete dashboard '{uid}': {err}");
                report.fail(ObjectKind::Dashboard, &uid, Step::DeleteDashboard, &err);
                continue;
            } else {
                tracing::info!("Deleted dashboard '{uid}'");
            }
            report.record(SyncAction::DashboardDeleted { uid });
        }
    }
}
