//! Restore a backup directory into an instance.
//!
//! Folders are restored before dashboards, parents before children. A folder
//! whose parent is neither in the backup nor at the destination lands at the
//! root; so does a dashboard whose folder is missing.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Serialize;

use grafsync_core::{
    check_pristine, general_or, is_general, none_if_general, ApiError, Dashboard, Folder,
    FolderUpdate, GrafanaApi, ObjectKind,
};

use crate::error::BackupError;
use crate::layout::{
    dashboard_path_at, dashboards_dir_at, folder_path_at, folders_dir_at, list_uids, read_json,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Refuse to restore into an instance that already has content.
    pub require_pristine: bool,
}

/// What happened to one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreFailure {
    pub kind: ObjectKind,
    pub uid: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub folders_created: Vec<String>,
    pub folders_updated: Vec<String>,
    pub dashboards_restored: Vec<String>,
    pub failures: Vec<RestoreFailure>,
}

impl RestoreReport {
    fn fail(&mut self, kind: ObjectKind, uid: &str, err: &dyn std::fmt::Display) {
        self.failures.push(RestoreFailure {
            kind,
            uid: uid.to_owned(),
            message: err.to_string(),
        });
    }
}

async fn folder_exists(api: &dyn GrafanaApi, uid: &str) -> bool {
    !is_general(Some(uid)) && api.get_folder(uid).await.is_ok()
}

/// Restore one folder from `root`: retitle it if it exists, otherwise create
/// it under its recorded parent (or the root when that parent is missing).
pub async fn restore_folder(
    api: &dyn GrafanaApi,
    root: &Path,
    uid: &str,
) -> Result<FolderOutcome, BackupError> {
    let path = folder_path_at(root, uid);
    let folder: Folder = read_json(&path)?;

    match api.get_folder(uid).await {
        Ok(_) => {
            api.update_folder(uid, FolderUpdate::retitle(folder.title.as_str()))
                .await?;
            tracing::info!("Updated folder '{}' from {}", folder.title, path.display());
            Ok(FolderOutcome::Updated)
        }
        Err(err) if err.is_not_found() => {
            let mut parent = none_if_general(folder.parent_uid.as_deref());
            if let Some(missing) = parent {
                if !folder_exists(api, missing).await {
                    tracing::warn!(
                        "parent '{missing}' of folder '{uid}' missing at destination, restoring at root"
                    );
                    parent = None;
                }
            }
            api.create_folder(&folder.title, Some(uid), parent).await?;
            tracing::info!("Created folder '{}' from {}", folder.title, path.display());
            Ok(FolderOutcome::Created)
        }
        Err(err) => Err(err.into()),
    }
}

/// Restore one dashboard from `root` into its recorded folder (or the root
/// when that folder is missing). The backed-up `id` is dropped.
pub async fn restore_dashboard(
    api: &dyn GrafanaApi,
    root: &Path,
    uid: &str,
) -> Result<(), BackupError> {
    let path = dashboard_path_at(root, uid);
    let dashboard: Dashboard = read_json(&path)?;

    let recorded = dashboard.folder_uid();
    let folder = if is_general(Some(recorded)) || folder_exists(api, recorded).await {
        none_if_general(Some(recorded))
    } else {
        tracing::warn!("folder '{recorded}' of dashboard '{uid}' missing, restoring at root");
        None
    };

    api.update_dashboard(&dashboard.dashboard.without_id(), folder)
        .await?;
    tracing::info!(
        "Restored dashboard '{}' from {}",
        dashboard.dashboard.title,
        path.display()
    );
    Ok(())
}

/// Order folders so that every parent present in `folders` comes before its
/// children. Folders caught in a cycle keep their relative order at the end.
pub(crate) fn parents_first(folders: &BTreeMap<String, Folder>) -> Vec<String> {
    let mut ordered = Vec::with_capacity(folders.len());
    let mut placed: HashSet<&str> = HashSet::new();
    loop {
        let mut progressed = false;
        for (uid, folder) in folders {
            if placed.contains(uid.as_str()) {
                continue;
            }
            let parent = general_or(folder.parent_uid.as_deref());
            let ready = !folders.contains_key(parent) || placed.contains(parent);
            if ready {
                placed.insert(uid);
                ordered.push(uid.clone());
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    for uid in folders.keys() {
        if !placed.contains(uid.as_str()) {
            ordered.push(uid.clone());
        }
    }
    ordered
}

/// Restore everything in the backup at `root`.
///
/// Per-object failures are recorded and the restore continues; a missing
/// backup, an unreadable file or a failed pristine check abort it.
pub async fn restore(
    api: &dyn GrafanaApi,
    root: &Path,
    options: &RestoreOptions,
) -> Result<RestoreReport, BackupError> {
    let folders_dir = folders_dir_at(root);
    let dashboards_dir = dashboards_dir_at(root);
    if !folders_dir.is_dir() && !dashboards_dir.is_dir() {
        return Err(BackupError::BackupNotFound {
            path: root.to_path_buf(),
        });
    }
    if options.require_pristine {
        check_pristine(api).await?;
    }

    let mut folders = BTreeMap::new();
    for uid in list_uids(&folders_dir)? {
        let folder: Folder = read_json(&folder_path_at(root, &uid))?;
        folders.insert(uid, folder);
    }

    let mut report = RestoreReport::default();
    for uid in parents_first(&folders) {
        match restore_folder(api, root, &uid).await {
            Ok(FolderOutcome::Created) => report.folders_created.push(uid),
            Ok(FolderOutcome::Updated) => report.folders_updated.push(uid),
            Err(BackupError::Api(err)) => {
                tracing::error!("Failed to restore folder '{uid}': {err}");
                report.fail(ObjectKind::Folder, &uid, &err);
            }
            Err(err) => return Err(err),
        }
    }

    for uid in list_uids(&dashboards_dir)? {
        match restore_dashboard(api, root, &uid).await {
            Ok(()) => report.dashboards_restored.push(uid),
            Err(BackupError::Api(err)) => {
                tracing::error!("Failed to restore dashboard '{uid}': {err}");
                report.fail(ObjectKind::Dashboard, &uid, &err);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(report)
}

/// `true` when an error only says the instance is not empty.
pub fn is_not_pristine(err: &BackupError) -> bool {
    matches!(
        err,
        BackupError::Api(ApiError::ExistingFolders(_) | ApiError::ExistingDashboards(_))
    )
}

#[cfg(test)]
mod tests {
    use grafsync_core::memory::InMemoryGrafana;
    use grafsync_core::DashboardContent;
    use tempfile::TempDir;

    use crate::layout::write_json_atomic;

    use super::*;

    fn folder(uid: &str, parent: Option<&str>) -> Folder {
        Folder {
            uid: uid.into(),
            title: uid.to_uppercase(),
            parent_uid: parent.map(str::to_owned),
            version: Some(1),
        }
    }

    fn write_folder(root: &Path, f: &Folder) {
        write_json_atomic(&folder_path_at(root, &f.uid), f).unwrap();
    }

    #[test]
    fn parents_come_before_children() {
        let mut folders = BTreeMap::new();
        // Alphabetical order would put the child first.
        for f in [
            folder("a-child", Some("z-parent")),
            folder("z-parent", Some("m-grand")),
            folder("m-grand", None),
            folder("orphan", Some("not-in-backup")),
        ] {
            folders.insert(f.uid.clone(), f);
        }
        assert_eq!(
            parents_first(&folders),
            vec!["m-grand", "orphan", "z-parent", "a-child"]
        );
    }

    #[test]
    fn cycles_do_not_hang() {
        let mut folders = BTreeMap::new();
        folders.insert("x".to_string(), folder("x", Some("y")));
        folders.insert("y".to_string(), folder("y", Some("x")));
        assert_eq!(parents_first(&folders), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn existing_folder_is_retitled_missing_one_created() {
        let tmp = TempDir::new().unwrap();
        let store = InMemoryGrafana::new();
        store.create_folder("old title", Some("a"), None).await.unwrap();
        write_folder(tmp.path(), &folder("a", None));
        write_folder(tmp.path(), &folder("b", Some("a")));

        assert_eq!(
            restore_folder(&store, tmp.path(), "a").await.unwrap(),
            FolderOutcome::Updated
        );
        assert_eq!(store.get_folder("a").await.unwrap().title, "A");
        assert_eq!(
            restore_folder(&store, tmp.path(), "b").await.unwrap(),
            FolderOutcome::Created
        );
        assert_eq!(store.folder_parent("b").as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn missing_parent_falls_back_to_root() {
        let tmp = TempDir::new().unwrap();
        let store = InMemoryGrafana::new();
        write_folder(tmp.path(), &folder("b", Some("gone")));

        restore_folder(&store, tmp.path(), "b").await.unwrap();
        assert_eq!(store.folder_parent("b").as_deref(), Some("general"));
    }

    #[tokio::test]
    async fn missing_backup_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        let store = InMemoryGrafana::new();
        let err = restore_dashboard(&store, tmp.path(), "nope").await.unwrap_err();
        assert!(matches!(err, BackupError::BackupNotFound { .. }));

        let err = restore(&store, &tmp.path().join("absent"), &RestoreOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::BackupNotFound { .. }));
    }

    #[tokio::test]
    async fn pristine_requirement_is_enforced() {
        let tmp = TempDir::new().unwrap();
        write_folder(tmp.path(), &folder("a", None));
        let store = InMemoryGrafana::new();
        store
            .update_dashboard(&DashboardContent::new("d", "D"), None)
            .await
            .unwrap();

        let options = RestoreOptions {
            require_pristine: true,
        };
        let err = restore(&store, tmp.path(), &options).await.unwrap_err();
        assert!(is_not_pristine(&err), "got: {err}");
        assert_eq!(store.folder_count(), 0);
    }
}
