//! Snapshot folders and dashboards of an instance into a backup directory.
//!
//! Dashboard files are hash-gated: one whose canonical fingerprint and folder
//! match the manifest, and whose file still exists, is not rewritten.

use std::path::Path;

use chrono::Utc;

use grafsync_core::{GrafanaApi, FOLDER_GENERAL};
use grafsync_sync::TreeWalker;

use crate::error::{io_err, BackupError};
use crate::layout::{
    dashboard_path_at, dashboards_dir_at, folder_path_at, folders_dir_at, load_manifest_at,
    save_manifest_at, write_json_atomic, ManifestEntry,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    /// Folder to start from; `general` backs up everything.
    pub folder_uid: String,
    pub include_dashboards: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            folder_uid: FOLDER_GENERAL.to_string(),
            include_dashboards: true,
        }
    }
}

/// Outcome of one backup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub folders: Vec<String>,
    pub dashboards_written: Vec<String>,
    pub dashboards_unchanged: Vec<String>,
}

/// Back up `options.folder_uid` and everything below it into `root`.
///
/// Listing or read failures abort the backup; the manifest is only saved
/// after every file was written.
pub async fn backup(
    api: &dyn GrafanaApi,
    root: &Path,
    options: &BackupOptions,
) -> Result<BackupReport, BackupError> {
    for dir in [folders_dir_at(root), dashboards_dir_at(root)] {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }
    let mut manifest = load_manifest_at(root)?;
    let mut report = BackupReport::default();

    let mut walker = TreeWalker::new(api, &options.folder_uid, true, options.include_dashboards);
    while let Some(node) = walker.next().await {
        let node = node?;

        if node.folder_uid != FOLDER_GENERAL {
            let folder = api.get_folder(&node.folder_uid).await?;
            let path = folder_path_at(root, &folder.uid);
            write_json_atomic(&path, &folder)?;
            tracing::info!("Backed up folder '{}' to {}", folder.title, path.display());
            report.folders.push(folder.uid);
        }

        for summary in &node.dashboards {
            let dashboard = match api.get_dashboard(&summary.uid).await {
                Ok(dashboard) => dashboard,
                Err(err) if err.is_not_found() => {
                    tracing::error!("Dashboard {} not found", summary.uid);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let path = dashboard_path_at(root, &summary.uid);
            let entry = ManifestEntry {
                fingerprint: dashboard.dashboard.fingerprint(),
                folder_uid: dashboard.folder_uid().to_owned(),
            };
            if path.exists() && manifest.dashboards.get(&summary.uid) == Some(&entry) {
                tracing::debug!("unchanged: {}", path.display());
                report.dashboards_unchanged.push(summary.uid.clone());
                continue;
            }

            write_json_atomic(&path, &dashboard)?;
            tracing::info!(
                "Backed up dashboard '{}' to {}",
                dashboard.dashboard.title,
                path.display()
            );
            manifest.dashboards.insert(summary.uid.clone(), entry);
            report.dashboards_written.push(summary.uid.clone());
        }
    }

    manifest.backed_up_at = Utc::now();
    save_manifest_at(root, &manifest)?;
    Ok(report)
}
