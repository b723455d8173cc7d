//! The remote-store capability every sync, backup and restore step runs against.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
    Dashboard, DashboardContent, DashboardSummary, DashboardWriteResult, Folder, FolderUpdate,
    FOLDER_GENERAL,
};

/// Folder and dashboard operations of a Grafana instance.
///
/// Implemented over HTTP by `grafsync-client` and in memory by
/// [`InMemoryGrafana`](crate::memory::InMemoryGrafana).
#[async_trait]
pub trait GrafanaApi: Send + Sync {
    /// Fetch one folder. Missing folders (and the virtual root) yield
    /// [`ApiError::NotFound`].
    async fn get_folder(&self, uid: &str) -> Result<Folder, ApiError>;

    /// Direct children of `parent_uid`; `None` or `general` lists top-level folders.
    async fn list_folders(&self, parent_uid: Option<&str>) -> Result<Vec<Folder>, ApiError>;

    async fn create_folder(
        &self,
        title: &str,
        uid: Option<&str>,
        parent_uid: Option<&str>,
    ) -> Result<Folder, ApiError>;

    async fn update_folder(&self, uid: &str, update: FolderUpdate) -> Result<Folder, ApiError>;

    /// Re-parent a folder; `None` moves it to the root.
    ///
    /// Reads the current title and reissues an overwriting update.
    async fn move_folder(&self, uid: &str, new_parent_uid: Option<&str>) -> Result<Folder, ApiError> {
        let current = self.get_folder(uid).await?;
        self.update_folder(
            uid,
            FolderUpdate {
                title: current.title,
                version: None,
                parent_uid: Some(new_parent_uid.map(str::to_owned)),
                overwrite: true,
            },
        )
        .await
    }

    /// Delete a folder together with everything below it.
    async fn delete_folder(&self, uid: &str) -> Result<(), ApiError>;

    /// Dashboards whose folder is one of `folder_uids` (`general` selects the
    /// root); `None` searches everywhere.
    async fn search_dashboards(
        &self,
        folder_uids: Option<&[String]>,
    ) -> Result<Vec<DashboardSummary>, ApiError>;

    async fn get_dashboard(&self, uid: &str) -> Result<Dashboard, ApiError>;

    /// Create or overwrite the dashboard with `content.uid`.
    async fn update_dashboard(
        &self,
        content: &DashboardContent,
        folder_uid: Option<&str>,
    ) -> Result<DashboardWriteResult, ApiError>;

    async fn delete_dashboard(&self, uid: &str) -> Result<(), ApiError>;
}

/// Fail unless the instance has no folders and no dashboards.
pub async fn check_pristine(api: &dyn GrafanaApi) -> Result<(), ApiError> {
    let folders = api.list_folders(None).await?;
    if !folders.is_empty() {
        return Err(ApiError::ExistingFolders(folders.len()));
    }
    let dashboards = api.search_dashboards(None).await?;
    if !dashboards.is_empty() {
        return Err(ApiError::ExistingDashboards(dashboards.len()));
    }
    Ok(())
}

/// Delete every top-level folder (cascading) and every remaining dashboard.
pub async fn delete_all(api: &dyn GrafanaApi) -> Result<(), ApiError> {
    for folder in api.list_folders(Some(FOLDER_GENERAL)).await? {
        tracing::debug!("deleting folder {}", folder.uid);
        api.delete_folder(&folder.uid).await?;
    }
    for dashboard in api.search_dashboards(None).await? {
        tracing::debug!("deleting dashboard {}", dashboard.uid);
        match api.delete_dashboard(&dashboard.uid).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
