//! `grafana-sync diff`: unified diffs of dashboards that differ.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use grafsync_core::FOLDER_GENERAL;
use grafsync_sync::diff_dashboards;

use super::{block_on, connect, profiles};
use crate::GlobalArgs;

/// Arguments for `grafana-sync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Source instance (URL or profile name).
    #[arg(long, env = "GRAFANA_SYNC_SRC")]
    pub src: String,

    /// Destination instance (URL or profile name).
    #[arg(long, env = "GRAFANA_SYNC_DST")]
    pub dst: String,

    /// Folder to compare; `general` compares the whole instance.
    #[arg(long, env = "GRAFANA_SYNC_FOLDER_UID", default_value = FOLDER_GENERAL)]
    pub folder_uid: String,

    /// Only compare dashboards directly in the selected folder.
    #[arg(long)]
    pub no_recursive: bool,
}

impl DiffArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let profiles = profiles(global)?;
        let src = connect(&profiles, &self.src)?;
        let dst = connect(&profiles, &self.dst)?;

        let diffs = block_on(diff_dashboards(
            &src,
            &dst,
            &self.folder_uid,
            !self.no_recursive,
        ))?
        .with_context(|| format!("diff of folder '{}' failed", self.folder_uid))?;

        if diffs.is_empty() {
            println!("No differences.");
            return Ok(ExitCode::SUCCESS);
        }

        for diff in diffs {
            match &diff.dst_folder {
                Some(folder) if *folder != diff.src_folder => println!(
                    "# {} '{}' (folder {} -> {})",
                    diff.uid, diff.title, folder, diff.src_folder
                ),
                Some(_) => println!("# {} '{}'", diff.uid, diff.title),
                None => println!("# {} '{}' (missing at destination)", diff.uid, diff.title),
            }
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}
