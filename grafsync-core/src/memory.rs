//! In-memory [`GrafanaApi`] implementation for testing.
//!
//! [`InMemoryGrafana`] enforces the rules a real instance enforces on writes
//! (parents must exist, no folder cycles, unique titles among siblings,
//! version checks, cascading folder deletes) so the reconciliation logic can
//! be exercised without a server.
//!
//! ## Limitations
//!
//! - **NOT suitable for production**: state lives in process memory only
//! - Folder listings are ordered by title, then uid

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::api::GrafanaApi;
use crate::error::ApiError;
use crate::types::{
    general_or, is_general, Dashboard, DashboardContent, DashboardMeta, DashboardSummary,
    DashboardWriteResult, Folder, FolderUpdate, FOLDER_GENERAL,
};

/// Store operations that can be made to fail with [`InMemoryGrafana::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetFolder,
    ListFolders,
    CreateFolder,
    UpdateFolder,
    DeleteFolder,
    SearchDashboards,
    GetDashboard,
    WriteDashboard,
    DeleteDashboard,
}

/// A successful mutating call, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateFolder(String),
    UpdateFolder(String),
    DeleteFolder(String),
    WriteDashboard(String),
    DeleteDashboard(String),
}

/// How an injected fault fails its call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// `NotFound` for reads, a 500 status for everything else.
    Default,
    Status(u16),
}

#[derive(Debug, Clone)]
struct StoredDashboard {
    content: DashboardContent,
    folder_uid: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    folders: BTreeMap<String, Folder>,
    dashboards: BTreeMap<String, StoredDashboard>,
    next_id: u64,
    mutations: Vec<Mutation>,
    faults: HashMap<(Operation, String), Fault>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_fault(&self, op: Operation, uid: &str) -> Result<(), ApiError> {
        let Some(fault) = self.faults.get(&(op, uid.to_owned())) else {
            return Ok(());
        };
        let status = match (fault, op) {
            // A read that fails looks like the object vanished between calls.
            (Fault::Default, Operation::GetFolder) => return Err(ApiError::folder_not_found(uid)),
            (Fault::Default, Operation::GetDashboard) => {
                return Err(ApiError::dashboard_not_found(uid))
            }
            (Fault::Default, _) => 500,
            (Fault::Status(status), _) => *status,
        };
        Err(ApiError::Status {
            method: format!("{op:?}"),
            url: format!("memory://{uid}"),
            status,
            message: "injected failure".to_string(),
        })
    }

    fn require_folder(&self, uid: &str) -> Result<&Folder, ApiError> {
        self.folders
            .get(uid)
            .ok_or_else(|| ApiError::folder_not_found(uid))
    }

    fn is_ancestor_or_self(&self, candidate: &str, of: &str) -> bool {
        let mut cursor = Some(of.to_owned());
        while let Some(uid) = cursor {
            if uid == candidate {
                return true;
            }
            cursor = self.folders.get(&uid).and_then(|f| f.parent_uid.clone());
        }
        false
    }

    fn descendants(&self, uid: &str) -> Vec<String> {
        let mut found = vec![uid.to_owned()];
        let mut index = 0;
        while index < found.len() {
            let current = found[index].clone();
            found.extend(
                self.folders
                    .values()
                    .filter(|f| f.parent_uid.as_deref() == Some(current.as_str()))
                    .map(|f| f.uid.clone()),
            );
            index += 1;
        }
        found
    }
}

/// In-memory Grafana instance.
#[derive(Debug, Default)]
pub struct InMemoryGrafana {
    state: Mutex<State>,
}

impl InMemoryGrafana {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `op` fail for `uid`.
    ///
    /// Reads fail with `NotFound`, writes with a 500 status. `ListFolders`
    /// and `SearchDashboards` are keyed by the folder being listed
    /// (`general` for the root, `*` for an unscoped search).
    pub fn fail_on(&self, op: Operation, uid: &str) {
        self.lock().faults.insert((op, uid.to_owned()), Fault::Default);
    }

    /// Make `op` fail for `uid` with an HTTP `status`, reads included.
    pub fn fail_with_status(&self, op: Operation, uid: &str, status: u16) {
        self.lock()
            .faults
            .insert((op, uid.to_owned()), Fault::Status(status));
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Successful mutations since creation or the last [`clear_mutations`](Self::clear_mutations).
    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.lock().mutations.clear();
    }

    /// Number of dashboard writes recorded.
    pub fn dashboard_writes(&self) -> usize {
        self.lock()
            .mutations
            .iter()
            .filter(|m| matches!(m, Mutation::WriteDashboard(_)))
            .count()
    }

    pub fn folder_count(&self) -> usize {
        self.lock().folders.len()
    }

    pub fn dashboard_count(&self) -> usize {
        self.lock().dashboards.len()
    }
}

#[async_trait]
impl GrafanaApi for InMemoryGrafana {
    async fn get_folder(&self, uid: &str) -> Result<Folder, ApiError> {
        let state = self.lock();
        state.check_fault(Operation::GetFolder, uid)?;
        state.require_folder(uid).cloned()
    }

    async fn list_folders(&self, parent_uid: Option<&str>) -> Result<Vec<Folder>, ApiError> {
        let state = self.lock();
        let parent = general_or(parent_uid);
        state.check_fault(Operation::ListFolders, parent)?;
        let mut children: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.parent_or_general() == parent)
            .map(|f| Folder {
                version: None,
                ..f.clone()
            })
            .collect();
        children.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.uid.cmp(&b.uid)));
        Ok(children)
    }

    async fn create_folder(
        &self,
        title: &str,
        uid: Option<&str>,
        parent_uid: Option<&str>,
    ) -> Result<Folder, ApiError> {
        let mut state = self.lock();
        let uid = match uid {
            Some(uid) => uid.to_owned(),
            None => format!("f{}", state.next_id()),
        };
        state.check_fault(Operation::CreateFolder, &uid)?;

        if title.trim().is_empty() {
            return Err(ApiError::InvalidRequest("folder title cannot be empty".into()));
        }
        if is_general(Some(&uid)) {
            return Err(ApiError::Rejected(format!("uid '{uid}' is reserved")));
        }
        if state.folders.contains_key(&uid) {
            return Err(ApiError::Rejected(format!(
                "a folder with uid '{uid}' already exists"
            )));
        }
        let parent = if is_general(parent_uid) {
            None
        } else {
            parent_uid.map(str::to_owned)
        };
        if let Some(parent) = &parent {
            if !state.folders.contains_key(parent) {
                return Err(ApiError::Rejected(format!("parent folder '{parent}' not found")));
            }
        }
        let sibling_clash = state
            .folders
            .values()
            .any(|f| f.parent_uid == parent && f.title == title);
        if sibling_clash {
            return Err(ApiError::Rejected(format!(
                "a folder named '{title}' already exists in this location"
            )));
        }

        let folder = Folder {
            uid: uid.clone(),
            title: title.to_owned(),
            parent_uid: parent,
            version: Some(1),
        };
        state.folders.insert(uid.clone(), folder.clone());
        state.mutations.push(Mutation::CreateFolder(uid));
        Ok(folder)
    }

    async fn update_folder(&self, uid: &str, update: FolderUpdate) -> Result<Folder, ApiError> {
        let mut state = self.lock();
        state.check_fault(Operation::UpdateFolder, uid)?;
        let current = state.require_folder(uid)?.clone();

        if !update.overwrite {
            let Some(version) = update.version else {
                return Err(ApiError::InvalidRequest(
                    "version must be provided when overwrite is false".into(),
                ));
            };
            if current.version != Some(version) {
                return Err(ApiError::Rejected(
                    "the folder has been changed by someone else".into(),
                ));
            }
        }

        let parent = match update.parent_uid {
            None => current.parent_uid.clone(),
            Some(parent) if is_general(parent.as_deref()) => None,
            Some(Some(parent)) => {
                state.require_folder(&parent)?;
                if state.is_ancestor_or_self(uid, &parent) {
                    return Err(ApiError::Rejected(format!(
                        "moving '{uid}' under '{parent}' would create a cycle"
                    )));
                }
                Some(parent)
            }
            Some(None) => None,
        };

        let folder = Folder {
            uid: uid.to_owned(),
            title: update.title,
            parent_uid: parent,
            version: Some(current.version.unwrap_or(0) + 1),
        };
        state.folders.insert(uid.to_owned(), folder.clone());
        state.mutations.push(Mutation::UpdateFolder(uid.to_owned()));
        Ok(folder)
    }

    async fn delete_folder(&self, uid: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.check_fault(Operation::DeleteFolder, uid)?;
        state.require_folder(uid)?;

        let doomed = state.descendants(uid);
        for folder in &doomed {
            state.folders.remove(folder);
        }
        state
            .dashboards
            .retain(|_, d| !d.folder_uid.as_ref().is_some_and(|f| doomed.contains(f)));
        state.mutations.push(Mutation::DeleteFolder(uid.to_owned()));
        Ok(())
    }

    async fn search_dashboards(
        &self,
        folder_uids: Option<&[String]>,
    ) -> Result<Vec<DashboardSummary>, ApiError> {
        let state = self.lock();
        match folder_uids {
            None => state.check_fault(Operation::SearchDashboards, "*")?,
            Some(uids) => {
                for uid in uids {
                    state.check_fault(Operation::SearchDashboards, general_or(Some(uid)))?;
                }
            }
        }

        let wanted: Option<HashSet<&str>> =
            folder_uids.map(|uids| uids.iter().map(|u| general_or(Some(u))).collect());
        let mut hits: Vec<DashboardSummary> = state
            .dashboards
            .values()
            .filter(|d| {
                wanted
                    .as_ref()
                    .map_or(true, |w| w.contains(general_or(d.folder_uid.as_deref())))
            })
            .map(|d| DashboardSummary {
                uid: d.content.uid.clone(),
                title: d.content.title.clone(),
                kind: "dash-db".to_string(),
                tags: Vec::new(),
                folder_uid: d.folder_uid.clone(),
                folder_title: d
                    .folder_uid
                    .as_ref()
                    .and_then(|f| state.folders.get(f))
                    .map(|f| f.title.clone()),
            })
            .collect();
        hits.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.uid.cmp(&b.uid)));
        Ok(hits)
    }

    async fn get_dashboard(&self, uid: &str) -> Result<Dashboard, ApiError> {
        let state = self.lock();
        state.check_fault(Operation::GetDashboard, uid)?;
        let stored = state
            .dashboards
            .get(uid)
            .ok_or_else(|| ApiError::dashboard_not_found(uid))?;
        let folder_title = stored
            .folder_uid
            .as_ref()
            .and_then(|f| state.folders.get(f))
            .map(|f| f.title.clone());
        Ok(Dashboard {
            dashboard: stored.content.clone(),
            meta: DashboardMeta {
                // Grafana reports the root folder as an empty uid.
                folder_uid: Some(stored.folder_uid.clone().unwrap_or_default()),
                folder_title,
            },
        })
    }

    async fn update_dashboard(
        &self,
        content: &DashboardContent,
        folder_uid: Option<&str>,
    ) -> Result<DashboardWriteResult, ApiError> {
        let mut state = self.lock();
        state.check_fault(Operation::WriteDashboard, &content.uid)?;

        if content.uid.is_empty() {
            return Err(ApiError::InvalidRequest("dashboard uid is required".into()));
        }
        let folder = if is_general(folder_uid) {
            None
        } else {
            folder_uid.map(str::to_owned)
        };
        if let Some(folder) = &folder {
            if !state.folders.contains_key(folder) {
                return Err(ApiError::Rejected(format!("folder '{folder}' not found")));
            }
        }

        let (id, version) = match state.dashboards.get(&content.uid) {
            Some(existing) => (
                existing.content.id.unwrap_or_default(),
                existing.content.version.unwrap_or(0) + 1,
            ),
            None => (state.next_id(), 1),
        };
        let mut stored = content.clone();
        stored.id = Some(id);
        stored.version = Some(version);
        state.dashboards.insert(
            content.uid.clone(),
            StoredDashboard {
                content: stored,
                folder_uid: folder.clone(),
            },
        );
        state
            .mutations
            .push(Mutation::WriteDashboard(content.uid.clone()));

        Ok(DashboardWriteResult {
            uid: content.uid.clone(),
            id: Some(id),
            version,
            status: "success".to_string(),
            url: format!("/d/{}", content.uid),
        })
    }

    async fn delete_dashboard(&self, uid: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.check_fault(Operation::DeleteDashboard, uid)?;
        if state.dashboards.remove(uid).is_none() {
            return Err(ApiError::dashboard_not_found(uid));
        }
        state.mutations.push(Mutation::DeleteDashboard(uid.to_owned()));
        Ok(())
    }
}

impl InMemoryGrafana {
    /// Folder uid a dashboard currently lives in (`general` for the root).
    pub fn dashboard_folder(&self, uid: &str) -> Option<String> {
        self.lock()
            .dashboards
            .get(uid)
            .map(|d| general_or(d.folder_uid.as_deref()).to_owned())
    }

    /// Parent uid of a folder (`general` for top-level folders).
    pub fn folder_parent(&self, uid: &str) -> Option<String> {
        self.lock()
            .folders
            .get(uid)
            .map(|f| f.parent_uid.clone().unwrap_or_else(|| FOLDER_GENERAL.to_owned()))
    }
}
