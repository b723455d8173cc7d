//! grafana-sync: copy folders and dashboards between Grafana instances.
//!
//! # Usage
//!
//! ```text
//! grafana-sync sync --src <instance> --dst <instance> [--folder-uid <uid>] [--prune] [--dry-run]
//! grafana-sync diff --src <instance> --dst <instance> [--folder-uid <uid>]
//! grafana-sync backup --instance <instance> --path <dir>
//! grafana-sync restore --instance <instance> --path <dir> [--require-pristine]
//! grafana-sync ls --instance <instance> [--recursive] [--datasources] [--json]
//! ```
//!
//! An instance is either an `http(s)://` URL or the name of a profile in
//! `<config_dir>/grafana-sync/config.yaml`.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    backup::BackupArgs, diff::DiffArgs, ls::LsArgs, restore::RestoreArgs, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "grafana-sync",
    version,
    about = "Synchronize Grafana folders and dashboards between instances",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Profiles file to use instead of the default location.
    #[arg(long, global = true, env = "GRAFANA_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile a destination instance with a source instance.
    Sync(SyncArgs),

    /// Show unified diffs of dashboards that differ between two instances.
    Diff(DiffArgs),

    /// Write folders and dashboards of an instance to a directory.
    Backup(BackupArgs),

    /// Replay a backup directory into an instance.
    Restore(RestoreArgs),

    /// List folders and dashboards of an instance.
    Ls(LsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match cli.command {
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Diff(args) => args.run(&cli.global),
        Commands::Backup(args) => args.run(&cli.global),
        Commands::Restore(args) => args.run(&cli.global),
        Commands::Ls(args) => args.run(&cli.global),
    }
}
