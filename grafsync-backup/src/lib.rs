//! # grafsync-backup
//!
//! Flat-file backup and restore of Grafana folders and dashboards.
//!
//! [`backup`] walks an instance and writes one JSON file per folder and per
//! dashboard, skipping dashboards whose content has not changed since the
//! last run. [`restore`] replays such a directory into an instance.

pub mod backup;
pub mod error;
pub mod layout;
pub mod restore;

pub use backup::{backup, BackupOptions, BackupReport};
pub use error::BackupError;
pub use restore::{
    is_not_pristine, restore, restore_dashboard, restore_folder, FolderOutcome, RestoreFailure,
    RestoreOptions, RestoreReport,
};
