//! `grafana-sync ls`: folders and dashboards of one instance.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use grafsync_core::{GrafanaApi, FOLDER_GENERAL};
use grafsync_sync::TreeWalker;

use super::{block_on, connect, profiles};
use crate::GlobalArgs;

/// Arguments for `grafana-sync ls`.
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Instance to list (URL or profile name).
    #[arg(long, env = "GRAFANA_SYNC_INSTANCE")]
    pub instance: String,

    /// Folder to list; `general` is the root.
    #[arg(long, default_value = FOLDER_GENERAL)]
    pub folder_uid: String,

    /// Descend into subfolders.
    #[arg(long)]
    pub recursive: bool,

    /// Fetch every dashboard and count its datasource references.
    #[arg(long)]
    pub datasources: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Entry {
    kind: &'static str,
    uid: String,
    title: String,
    parent_uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    datasources: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variable_datasources: Option<usize>,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "uid")]
    uid: String,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "folder")]
    parent_uid: String,
    #[tabled(rename = "datasources")]
    datasources: String,
}

impl LsArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let profiles = profiles(global)?;
        let api = connect(&profiles, &self.instance)?;

        let entries = block_on(self.collect(&api))??;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).context("failed to serialize listing")?
            );
        } else {
            print_table(&self.folder_uid, entries);
        }
        Ok(ExitCode::SUCCESS)
    }

    async fn collect(&self, api: &dyn GrafanaApi) -> Result<Vec<Entry>> {
        let mut walker = TreeWalker::new(api, &self.folder_uid, self.recursive, true);
        let mut entries = Vec::new();
        while let Some(node) = walker.next().await {
            let node = node.with_context(|| format!("listing '{}' failed", self.folder_uid))?;
            for folder in node.folders {
                entries.push(Entry {
                    kind: "folder",
                    parent_uid: node.folder_uid.clone(),
                    uid: folder.uid,
                    title: folder.title,
                    datasources: None,
                    variable_datasources: None,
                });
            }
            for summary in node.dashboards {
                let mut entry = Entry {
                    kind: "dashboard",
                    parent_uid: node.folder_uid.clone(),
                    uid: summary.uid,
                    title: summary.title,
                    datasources: None,
                    variable_datasources: None,
                };
                if self.datasources {
                    let dashboard = api
                        .get_dashboard(&entry.uid)
                        .await
                        .with_context(|| format!("failed to fetch dashboard '{}'", entry.uid))?;
                    entry.datasources = Some(dashboard.dashboard.datasource_count());
                    entry.variable_datasources =
                        Some(dashboard.dashboard.variable_datasource_count());
                }
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

fn print_table(folder_uid: &str, entries: Vec<Entry>) {
    if entries.is_empty() {
        println!("Nothing in '{folder_uid}'.");
        return;
    }
    let rows: Vec<EntryRow> = entries
        .into_iter()
        .map(|e| EntryRow {
            kind: match e.kind {
                "folder" => e.kind.blue().bold().to_string(),
                _ => e.kind.to_string(),
            },
            datasources: match (e.datasources, e.variable_datasources) {
                (Some(total), Some(variables)) => format!("{total} ({variables} via variables)"),
                _ => "-".to_string(),
            },
            uid: e.uid,
            title: e.title,
            parent_uid: e.parent_uid,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
