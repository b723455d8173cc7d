//! Folder reconciliation and the deferred relocation queue.
//!
//! Folders are reconciled in two phases. During the walk a folder is created
//! (or retitled) so that it exists at the destination; a parent change is only
//! queued. Once the walk is over every folder that can exist does exist, and
//! [`FolderReconciler::apply_relocations`] wires up the parents. A move
//! therefore never references a parent that has not been created yet.

use std::collections::HashSet;

use grafsync_core::{
    general_or, is_general, none_if_general, FolderUpdate, GrafanaApi, ObjectKind,
    FOLDER_GENERAL,
};

use crate::report::{Step, SyncAction, SyncReport};

// ---------------------------------------------------------------------------
// Relocation queue
// ---------------------------------------------------------------------------

/// Ordered `folder uid → desired parent uid` mapping.
///
/// Re-queueing a folder replaces its target but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationQueue {
    entries: Vec<(String, String)>,
}

impl RelocationQueue {
    pub fn enqueue(&mut self, folder_uid: &str, parent_uid: &str) {
        match self.entries.iter_mut().find(|(uid, _)| uid == folder_uid) {
            Some(entry) => entry.1 = parent_uid.to_owned(),
            None => self
                .entries
                .push((folder_uid.to_owned(), parent_uid.to_owned())),
        }
    }

    pub fn get(&self, folder_uid: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(uid, _)| uid == folder_uid)
            .map(|(_, parent)| parent.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every entry, leaving the queue empty.
    pub fn take(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.entries)
    }
}

// ---------------------------------------------------------------------------
// Folder reconciler
// ---------------------------------------------------------------------------

/// Makes destination folders match source folders, one at a time.
pub struct FolderReconciler<'a> {
    src: &'a dyn GrafanaApi,
    dst: &'a dyn GrafanaApi,
    dst_parent_uid: Option<String>,
    dry_run: bool,
    planned: HashSet<String>,
    queue: RelocationQueue,
}

impl<'a> FolderReconciler<'a> {
    /// `dst_parent_uid` is where source top-level folders go at the
    /// destination; `None` (or `general`) means the destination root.
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
            planned: HashSet::new(),
            queue: RelocationQueue::default(),
        }
    }

    pub fn queue(&self) -> &RelocationQueue {
        &self.queue
    }

    /// The destination parent matching a source parent.
    fn desired_parent(&self, src_parent: &str) -> String {
        if is_general(Some(src_parent)) {
            general_or(self.dst_parent_uid.as_deref()).to_owned()
        } else {
            src_parent.to_owned()
        }
    }

    async fn exists_at_destination(&self, uid: &str) -> bool {
        if self.planned.contains(uid) {
            return true;
        }
        match self.dst.get_folder(uid).await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!("folder '{uid}' not usable at destination: {err}");
                false
            }
        }
    }

    /// Reconcile one folder.
    ///
    /// `can_move` is `false` for the folder a sync was started from; its own
    /// position is not managed by the run. Failures are logged and recorded
    /// in `report`, never returned.
    pub async fn reconcile(&mut self, folder_uid: &str, can_move: bool, report: &mut SyncReport) {
        let src_folder = match self.src.get_folder(folder_uid).await {
            Ok(folder) => folder,
            Err(err) => {
                tracing::error!("Failed to read source folder '{folder_uid}': {err}");
                report.fail(ObjectKind::Folder, folder_uid, Step::ReadSource, &err);
                return;
            }
        };
        let title = src_folder.title.as_str();
        let desired = self.desired_parent(src_folder.parent_or_general());

        let existing = match self.dst.get_folder(folder_uid).await {
            Ok(folder) => Some(folder),
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                tracing::error!("Failed to read destination folder '{folder_uid}': {err}");
                report.fail(ObjectKind::Folder, folder_uid, Step::ReadDestination, &err);
                return;
            }
        };

        let Some(existing) = existing else {
            self.create(folder_uid, title, &desired, can_move, report)
                .await;
            return;
        };

        if existing.title != title {
            tracing::info!("Updating folder title '{title}' in destination");
            if self.dry_run {
                report.record(SyncAction::FolderRenamed {
                    uid: folder_uid.to_owned(),
                    title: title.to_owned(),
                });
            } else {
                match self
                    .dst
                    .update_folder(folder_uid, FolderUpdate::retitle(title))
                    .await
                {
                    Ok(_) => report.record(SyncAction::FolderRenamed {
                        uid: folder_uid.to_owned(),
                        title: title.to_owned(),
                    }),
                    Err(err) => {
                        tracing::error!("Failed to update folder '{title}': {err}");
                        report.fail(ObjectKind::Folder, folder_uid, Step::RenameFolder, &err);
                    }
                }
            }
        }

        if can_move && existing.parent_or_general() != desired {
            tracing::debug!("queueing relocation of folder '{folder_uid}' to '{desired}'");
            self.queue.enqueue(folder_uid, &desired);
        }
    }

    async fn create(
        &mut self,
        folder_uid: &str,
        title: &str,
        desired: &str,
        can_move: bool,
        report: &mut SyncReport,
    ) {
        let parent = if is_general(Some(desired)) || Some(desired) == self.dst_parent_uid.as_deref()
        {
            none_if_general(Some(desired)).map(str::to_owned)
        } else if self.exists_at_destination(desired).await {
            Some(desired.to_owned())
        } else {
            tracing::warn!(
                "parent '{desired}' of folder '{folder_uid}' missing at destination, creating at root"
            );
            None
        };
        let parent_label = general_or(parent.as_deref()).to_owned();

        tracing::info!("Creating folder '{title}' in destination");
        if self.dry_run {
            self.planned.insert(folder_uid.to_owned());
        } else if let Err(err) = self
            .dst
            .create_folder(title, Some(folder_uid), parent.as_deref())
            .await
        {
            tracing::error!("Failed to create folder '{title}': {err}");
            report.fail(ObjectKind::Folder, folder_uid, Step::CreateFolder, &err);
            return;
        } else {
            tracing::info!("Created folder '{title}' (uid: {folder_uid})");
        }
        report.record(SyncAction::FolderCreated {
            uid: folder_uid.to_owned(),
            parent_uid: parent_label.clone(),
        });

        // Created at the root as a fallback: let the relocation pass attach
        // it once the parent exists.
        if can_move && parent_label != desired {
            self.queue.enqueue(folder_uid, desired);
        }
    }

    /// Move every queued folder to its desired parent, then clear the queue.
    ///
    /// Moves are independent; a failed move is recorded and not retried.
    pub async fn apply_relocations(&mut self, report: &mut SyncReport) {
        for (folder_uid, parent_uid) in self.queue.take() {
            if self.dry_run {
                tracing::info!("[dry-run] would move folder '{folder_uid}' to '{parent_uid}'");
            } else if let Err(err) = self
                .dst
                .move_folder(&folder_uid, none_if_general(Some(&parent_uid)))
                .await
            {
                tracing::error!(
                    "Failed to move folder '{folder_uid}' to new parent '{parent_uid}': {err}"
                );
                report.fail(ObjectKind::Folder, &folder_uid, Step::MoveFolder, &err);
                continue;
            } else {
                tracing::info!("Moved folder '{folder_uid}' to new parent '{parent_uid}'");
            }
            report.record(SyncAction::FolderMoved {
                uid: folder_uid,
                parent_uid,
            });
        }
    }

    /// Drop queued relocations without applying them; returns how many.
    pub fn discard_relocations(&mut self) -> usize {
        self.queue.take().len()
    }
}
