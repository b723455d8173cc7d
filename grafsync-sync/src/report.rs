//! Outcome of a sync run.
//!
//! Every create, update, move, skip and delete is recorded as a
//! [`SyncAction`]; every per-object failure as a [`SyncFailure`]. A run that
//! finishes with failures still returns `Ok`, and the caller inspects the
//! report to learn whether the destination converged.

use serde::Serialize;

use grafsync_core::{ApiError, ObjectKind};

/// Something the run did (or, in dry-run mode, would have done).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    FolderCreated { uid: String, parent_uid: String },
    FolderRenamed { uid: String, title: String },
    FolderMoved { uid: String, parent_uid: String },
    DashboardWritten { uid: String, folder_uid: String },
    DashboardUnchanged { uid: String },
    DashboardDeleted { uid: String },
}

/// The step that failed for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ReadSource,
    ReadDestination,
    ListSource,
    InventoryDestination,
    CreateFolder,
    RenameFolder,
    MoveFolder,
    WriteDashboard,
    DeleteDashboard,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Step::ReadSource => "read source",
            Step::ReadDestination => "read destination",
            Step::ListSource => "list source",
            Step::InventoryDestination => "inventory destination",
            Step::CreateFolder => "create folder",
            Step::RenameFolder => "rename folder",
            Step::MoveFolder => "move folder",
            Step::WriteDashboard => "write dashboard",
            Step::DeleteDashboard => "delete dashboard",
        };
        f.write_str(label)
    }
}

/// One object the run failed to touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub kind: ObjectKind,
    pub uid: String,
    pub step: Step,
    pub message: String,
}

/// Everything a run did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub actions: Vec<SyncAction>,
    pub failures: Vec<SyncFailure>,
    /// Pruning was requested but not applied because part of the source
    /// could not be listed.
    pub prune_skipped: bool,
}

/// Per-action counts, for summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub folders_created: usize,
    pub folders_renamed: usize,
    pub folders_moved: usize,
    pub dashboards_written: usize,
    pub dashboards_unchanged: usize,
    pub dashboards_deleted: usize,
    pub failures: usize,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, action: SyncAction) {
        self.actions.push(action);
    }

    pub(crate) fn fail(&mut self, kind: ObjectKind, uid: &str, step: Step, err: &ApiError) {
        self.failures.push(SyncFailure {
            kind,
            uid: uid.to_owned(),
            step,
            message: err.to_string(),
        });
    }

    /// `true` when nothing failed; the destination matches the source.
    pub fn is_converged(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of dashboard create-or-overwrite writes.
    pub fn dashboard_writes(&self) -> usize {
        self.counts().dashboards_written
    }

    pub fn counts(&self) -> SyncCounts {
        let mut counts = SyncCounts {
            failures: self.failures.len(),
            ..SyncCounts::default()
        };
        for action in &self.actions {
            match action {
                SyncAction::FolderCreated { .. } => counts.folders_created += 1,
                SyncAction::FolderRenamed { .. } => counts.folders_renamed += 1,
                SyncAction::FolderMoved { .. } => counts.folders_moved += 1,
                SyncAction::DashboardWritten { .. } => counts.dashboards_written += 1,
                SyncAction::DashboardUnchanged { .. } => counts.dashboards_unchanged += 1,
                SyncAction::DashboardDeleted { .. } => counts.dashboards_deleted += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_actions() {
        let mut report = SyncReport::new(false);
        report.record(SyncAction::FolderCreated {
            uid: "a".into(),
            parent_uid: "general".into(),
        });
        report.record(SyncAction::DashboardWritten {
            uid: "d1".into(),
            folder_uid: "a".into(),
        });
        report.record(SyncAction::DashboardUnchanged { uid: "d2".into() });
        report.fail(
            ObjectKind::Dashboard,
            "d3",
            Step::WriteDashboard,
            &ApiError::Rejected("folder 'x' not found".into()),
        );

        let counts = report.counts();
        assert_eq!(counts.folders_created, 1);
        assert_eq!(counts.dashboards_written, 1);
        assert_eq!(counts.dashboards_unchanged, 1);
        assert_eq!(counts.failures, 1);
        assert!(!report.is_converged());
        assert_eq!(report.failures[0].message, "request rejected: folder 'x' not found");
    }

    #[test]
    fn actions_serialize_with_tag() {
        let action = SyncAction::FolderMoved {
            uid: "child".into(),
            parent_uid: "parent2".into(),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["action"], "folder_moved");
        assert_eq!(value["parent_uid"], "parent2");
    }
}
