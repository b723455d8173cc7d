//! Error types for grafsync-core.

use serde::Serialize;
use thiserror::Error;

/// The kind of remote object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Folder,
    Dashboard,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Folder => write!(f, "folder"),
            ObjectKind::Dashboard => write!(f, "dashboard"),
        }
    }
}

/// All errors a [`GrafanaApi`](crate::GrafanaApi) implementation can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested folder or dashboard does not exist.
    ///
    /// Callers treat this as a branch signal ("create it"), not a failure.
    #[error("{kind} '{uid}' not found")]
    NotFound { kind: ObjectKind, uid: String },

    /// The server answered with an error status.
    #[error("Grafana API error: {method} {url} returned {status} - {message}")]
    Status {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    /// The store refused the request (missing parent, cycle, version conflict, ...).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// A request that cannot be issued as given.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, TLS or timeout failure below the HTTP layer.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The store was not empty when an empty one was required.
    #[error("Grafana instance has {0} existing folder(s)")]
    ExistingFolders(usize),

    /// The store had dashboards when an empty one was required.
    #[error("Grafana instance has {0} existing dashboard(s)")]
    ExistingDashboards(usize),
}

impl ApiError {
    pub fn folder_not_found(uid: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind: ObjectKind::Folder,
            uid: uid.into(),
        }
    }

    pub fn dashboard_not_found(uid: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind: ObjectKind::Dashboard,
            uid: uid.into(),
        }
    }

    /// `true` when the error only says the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}
