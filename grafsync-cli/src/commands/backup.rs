//! `grafana-sync backup`: snapshot an instance into a directory.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use grafsync_backup::{backup, BackupOptions};
use grafsync_core::FOLDER_GENERAL;

use super::{block_on, connect, profiles};
use crate::GlobalArgs;

/// Arguments for `grafana-sync backup`.
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Instance to back up (URL or profile name).
    #[arg(long, env = "GRAFANA_SYNC_INSTANCE")]
    pub instance: String,

    /// Backup directory; created when missing.
    #[arg(long, env = "GRAFANA_SYNC_BACKUP_PATH")]
    pub path: PathBuf,

    /// Folder to start from; `general` backs up everything.
    #[arg(long, default_value = FOLDER_GENERAL)]
    pub folder_uid: String,

    /// Back up folders only.
    #[arg(long)]
    pub no_dashboards: bool,
}

impl BackupArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let profiles = profiles(global)?;
        let api = connect(&profiles, &self.instance)?;
        let options = BackupOptions {
            folder_uid: self.folder_uid.clone(),
            include_dashboards: !self.no_dashboards,
        };

        let report = block_on(backup(&api, &self.path, &options))?
            .with_context(|| format!("backup to {} failed", self.path.display()))?;

        println!(
            "{} backed up {} folders, {} dashboards written, {} unchanged -> {}",
            "✓".green().bold(),
            report.folders.len(),
            report.dashboards_written.len(),
            report.dashboards_unchanged.len(),
            self.path.display()
        );
        Ok(ExitCode::SUCCESS)
    }
}
