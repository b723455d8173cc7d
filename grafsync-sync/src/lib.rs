//! # grafsync-sync
//!
//! Folder and dashboard reconciliation between two Grafana instances.
//!
//! Call [`sync`] to make a destination match a source under one folder. The
//! run walks the source tree, creates or retitles folders, writes dashboards
//! whose canonical content differs, moves folders in a second pass once every
//! parent exists, and optionally prunes destination dashboards the source no
//! longer has. [`diff_dashboards`] shows what a sync would change.

pub mod dashboards;
pub mod diff;
pub mod error;
pub mod folders;
pub mod pipeline;
pub mod prune;
pub mod report;
pub mod walk;

pub use diff::{diff_dashboards, DashboardDiff};
pub use error::{SyncError, WalkError};
pub use pipeline::{sync, SyncOptions};
pub use report::{Step, SyncAction, SyncCounts, SyncFailure, SyncReport};
pub use walk::{TreeWalker, WalkNode};
