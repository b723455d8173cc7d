//! Depth-first walk over a folder hierarchy, like `os.walk` for Grafana.
//!
//! Each step lists one folder: its direct child folders and, optionally, its
//! direct dashboards. The starting folder's own record is never fetched.

use std::collections::HashSet;

use grafsync_core::{
    general_or, DashboardSummary, Folder, GrafanaApi, FOLDER_SHARED_WITH_ME,
};

use crate::error::WalkError;

/// Contents of one visited folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkNode {
    pub folder_uid: String,
    pub folders: Vec<Folder>,
    pub dashboards: Vec<DashboardSummary>,
}

/// Lazy pre-order traversal.
///
/// Children are visited in the order the store returns them. A folder that
/// fails to list yields one `Err` and its subtree is skipped; the walk then
/// continues with the remaining folders.
pub struct TreeWalker<'a> {
    api: &'a dyn GrafanaApi,
    recursive: bool,
    include_dashboards: bool,
    pending: Vec<String>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        api: &'a dyn GrafanaApi,
        folder_uid: &str,
        recursive: bool,
        include_dashboards: bool,
    ) -> Self {
        Self {
            api,
            recursive,
            include_dashboards,
            pending: vec![general_or(Some(folder_uid)).to_owned()],
        }
    }

    /// Visit the next folder, or `None` when the walk is done.
    pub async fn next(&mut self) -> Option<Result<WalkNode, WalkError>> {
        let folder_uid = self.pending.pop()?;

        tracing::debug!("fetching folders for folder_uid {folder_uid}");
        let folders = match self.api.list_folders(Some(&folder_uid)).await {
            Ok(folders) => folders,
            Err(source) => return Some(Err(WalkError { folder_uid, source })),
        };
        let folders: Vec<Folder> = folders
            .into_iter()
            .filter(|f| f.uid != FOLDER_SHARED_WITH_ME)
            .collect();

        let dashboards = if self.include_dashboards {
            tracing::debug!("searching dashboards for folder_uid {folder_uid}");
            let scope = [folder_uid.clone()];
            match self.api.search_dashboards(Some(&scope)).await {
                Ok(dashboards) => dashboards,
                Err(source) => return Some(Err(WalkError { folder_uid, source })),
            }
        } else {
            Vec::new()
        };

        if self.recursive {
            // Reversed so the first child is popped first.
            self.pending
                .extend(folders.iter().rev().map(|f| f.uid.clone()));
        }

        Some(Ok(WalkNode {
            folder_uid,
            folders,
            dashboards,
        }))
    }

    /// Drain the walk, stopping at the first listing failure.
    pub async fn collect(mut self) -> Result<Vec<WalkNode>, WalkError> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next().await {
            nodes.push(node?);
        }
        Ok(nodes)
    }
}

/// Every dashboard uid under `folder_uid`, at any depth.
///
/// Folders that fail to list are skipped and returned alongside the uids.
pub async fn collect_dashboard_uids(
    api: &dyn GrafanaApi,
    folder_uid: &str,
) -> (HashSet<String>, Vec<WalkError>) {
    let mut uids = HashSet::new();
    let mut errors = Vec::new();
    let mut walker = TreeWalker::new(api, folder_uid, true, true);
    while let Some(node) = walker.next().await {
        match node {
            Ok(node) => uids.extend(node.dashboards.into_iter().map(|d| d.uid)),
            Err(err) => errors.push(err),
        }
    }
    (uids, errors)
}
