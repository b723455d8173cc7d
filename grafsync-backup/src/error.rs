//! Error types for grafsync-backup.

use std::path::PathBuf;

use thiserror::Error;

use grafsync_core::ApiError;
use grafsync_sync::WalkError;

/// All errors that abort a backup or restore.
#[derive(Debug, Error)]
pub enum BackupError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A requested backup file or directory does not exist.
    #[error("backup {path} not found")]
    BackupNotFound { path: PathBuf },

    #[error("Grafana API error: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// Convenience constructor for [`BackupError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BackupError {
    BackupError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn json_err(path: impl Into<PathBuf>, source: serde_json::Error) -> BackupError {
    BackupError::Json {
        path: path.into(),
        source,
    }
}
