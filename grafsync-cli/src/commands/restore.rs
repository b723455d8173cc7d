//! `grafana-sync restore`: replay a backup directory into an instance.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use grafsync_backup::{restore, RestoreOptions};

use super::{block_on, connect, profiles};
use crate::GlobalArgs;

/// Arguments for `grafana-sync restore`.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Instance to restore into (URL or profile name).
    #[arg(long, env = "GRAFANA_SYNC_INSTANCE")]
    pub instance: String,

    /// Backup directory written by `grafana-sync backup`.
    #[arg(long, env = "GRAFANA_SYNC_BACKUP_PATH")]
    pub path: PathBuf,

    /// Refuse to restore into an instance that already has folders or dashboards.
    #[arg(long)]
    pub require_pristine: bool,
}

impl RestoreArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let profiles = profiles(global)?;
        let api = connect(&profiles, &self.instance)?;
        let options = RestoreOptions {
            require_pristine: self.require_pristine,
        };

        let report = block_on(restore(&api, &self.path, &options))?
            .with_context(|| format!("restore from {} failed", self.path.display()))?;

        for failure in &report.failures {
            eprintln!(
                "  {}  {} {}: {}",
                "✗".red().bold(),
                failure.kind,
                failure.uid,
                failure.message
            );
        }
        let summary = format!(
            "{} folders created, {} updated, {} dashboards restored",
            report.folders_created.len(),
            report.folders_updated.len(),
            report.dashboards_restored.len()
        );
        if report.failures.is_empty() {
            println!("{} {summary}", "✓".green().bold());
            Ok(ExitCode::SUCCESS)
        } else {
            println!(
                "{} {summary} | {} failures",
                "✗".red().bold(),
                report.failures.len()
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
