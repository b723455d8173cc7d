//! `grafana-sync sync`: reconcile a destination with a source.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use grafsync_core::FOLDER_GENERAL;
use grafsync_sync::{sync, SyncAction, SyncOptions, SyncReport};

use super::{block_on, connect, profiles};
use crate::GlobalArgs;

/// Arguments for `grafana-sync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source instance (URL or profile name).
    #[arg(long, env = "GRAFANA_SYNC_SRC")]
    pub src: String,

    /// Destination instance (URL or profile name).
    #[arg(long, env = "GRAFANA_SYNC_DST")]
    pub dst: String,

    /// Folder to sync; `general` syncs the whole instance.
    #[arg(long, env = "GRAFANA_SYNC_FOLDER_UID", default_value = FOLDER_GENERAL)]
    pub folder_uid: String,

    /// Only sync the selected folder, not its subfolders.
    #[arg(long)]
    pub no_recursive: bool,

    /// Sync folders only.
    #[arg(long)]
    pub no_dashboards: bool,

    /// Delete destination dashboards that are no longer in the source.
    #[arg(long, env = "GRAFANA_SYNC_PRUNE")]
    pub prune: bool,

    /// Leave folders whose source parent changed where they are.
    #[arg(long)]
    pub no_relocate_folders: bool,

    /// Leave dashboards whose source folder changed where they are.
    #[arg(long)]
    pub no_relocate_dashboards: bool,

    /// Destination folder that receives top-level content.
    #[arg(long, env = "GRAFANA_SYNC_DST_PARENT_UID")]
    pub dst_parent_uid: Option<String>,

    /// Read everything, change nothing, report what would be done.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    fn options(&self) -> SyncOptions {
        SyncOptions {
            folder_uid: self.folder_uid.clone(),
            recursive: !self.no_recursive,
            include_dashboards: !self.no_dashboards,
            prune: self.prune,
            relocate_folders: !self.no_relocate_folders,
            relocate_dashboards: !self.no_relocate_dashboards,
            dst_parent_uid: self.dst_parent_uid.clone(),
            dry_run: self.dry_run,
        }
    }

    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let profiles = profiles(global)?;
        let src = connect(&profiles, &self.src)?;
        let dst = connect(&profiles, &self.dst)?;
        let options = self.options();

        let report = block_on(sync(&src, &dst, &options))?
            .with_context(|| format!("sync from '{}' to '{}' failed", self.src, self.dst))?;

        print_report(&report);
        if report.is_converged() {
            Ok(ExitCode::SUCCESS)
        } else {
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    for action in &report.actions {
        match action {
            SyncAction::FolderCreated { uid, parent_uid } => {
                println!("  {}  folder {uid} (in {parent_uid})", "+".green())
            }
            SyncAction::FolderRenamed { uid, title } => {
                println!("  {}  folder {uid} renamed to '{title}'", "~".yellow())
            }
            SyncAction::FolderMoved { uid, parent_uid } => {
                println!("  {}  folder {uid} moved to {parent_uid}", "→".yellow())
            }
            SyncAction::DashboardWritten { uid, folder_uid } => {
                println!("  {}  dashboard {uid} (in {folder_uid})", "✎".green())
            }
            SyncAction::DashboardUnchanged { uid } => {
                println!("  {}  dashboard {uid}", "·".bright_black())
            }
            SyncAction::DashboardDeleted { uid } => {
                println!("  {}  dashboard {uid}", "-".red())
            }
        }
    }
    for failure in &report.failures {
        eprintln!(
            "  {}  {} {}: {} failed: {}",
            "✗".red().bold(),
            failure.kind,
            failure.uid,
            failure.step,
            failure.message
        );
    }

    if report.prune_skipped {
        eprintln!(
            "  {}  prune skipped: part of the source could not be listed",
            "!".yellow().bold()
        );
    }

    let counts = report.counts();
    let summary = format!(
        "{prefix}{} folders created, {} renamed, {} moved | {} dashboards written, {} unchanged, {} deleted",
        counts.folders_created,
        counts.folders_renamed,
        counts.folders_moved,
        counts.dashboards_written,
        counts.dashboards_unchanged,
        counts.dashboards_deleted,
    );
    if report.is_converged() {
        println!("{} {summary}", "✓".green().bold());
    } else {
        println!(
            "{} {summary} | {} failures",
            "✗".red().bold(),
            counts.failures
        );
    }
}
