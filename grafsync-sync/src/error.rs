//! Error types for grafsync-sync.

use thiserror::Error;

use grafsync_core::ApiError;

/// Errors that abort a sync or diff run.
///
/// Per-object failures during a sync never surface here; they are collected
/// in the [`SyncReport`](crate::SyncReport).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configured destination parent folder does not exist.
    #[error("destination parent folder '{uid}' not found: {source}")]
    DestinationParentNotFound {
        uid: String,
        #[source]
        source: ApiError,
    },

    /// A remote call failed where the operation cannot continue.
    #[error("Grafana API error: {0}")]
    Api(#[from] ApiError),

    /// Listing a folder's contents failed during a walk.
    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// A folder whose children or dashboards could not be listed.
#[derive(Debug, Error)]
#[error("failed to list folder '{folder_uid}': {source}")]
pub struct WalkError {
    pub folder_uid: String,
    #[source]
    pub source: ApiError,
}
