//! grafsync core library: domain types, the remote-store trait and errors.
//!
//! - [`types`]: folders, dashboards and the root sentinel
//! - [`content`]: canonical dashboard content and fingerprints
//! - [`datasources`]: datasource references inside dashboards
//! - [`api`]: the [`GrafanaApi`] trait plus pristine/wipe helpers
//! - [`memory`]: [`InMemoryGrafana`](memory::InMemoryGrafana) for tests
//! - [`error`]: [`ApiError`]

pub mod api;
pub mod content;
pub mod datasources;
pub mod error;
pub mod memory;
pub mod types;

pub use api::{check_pristine, delete_all, GrafanaApi};
pub use datasources::DataSourceRef;
pub use error::{ApiError, ObjectKind};
pub use types::{
    general_or, is_general, none_if_general, Dashboard, DashboardContent, DashboardMeta,
    DashboardSummary, DashboardWriteResult, Folder, FolderUpdate, FOLDER_GENERAL,
    FOLDER_SHARED_WITH_ME,
};
