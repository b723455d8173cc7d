//! Read-only unified diff of dashboard content for `grafana-sync diff`.

use similar::TextDiff;

use grafsync_core::{GrafanaApi, ObjectKind};

use crate::walk::TreeWalker;
use crate::SyncError;

/// One source dashboard whose destination copy differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardDiff {
    pub uid: String,
    pub title: String,
    pub src_folder: String,
    /// `None` when the dashboard does not exist at the destination.
    pub dst_folder: Option<String>,
    pub unified_diff: String,
}

/// Compare every source dashboard under `folder_uid` with the destination.
///
/// Content is compared in canonical form, so server bookkeeping and key
/// order never show up. Nothing is written.
pub async fn diff_dashboards(
    src: &dyn GrafanaApi,
    dst: &dyn GrafanaApi,
    folder_uid: &str,
    recursive: bool,
) -> Result<Vec<DashboardDiff>, SyncError> {
    let nodes = TreeWalker::new(src, folder_uid, recursive, true)
        .collect()
        .await?;

    let mut diffs = Vec::new();
    for node in nodes {
        for summary in node.dashboards {
            let source = match src.get_dashboard(&summary.uid).await {
                Ok(dashboard) => dashboard,
                Err(err) if err.is_not_found() => {
                    tracing::warn!("{} '{}' vanished from source", ObjectKind::Dashboard, summary.uid);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let existing = match dst.get_dashboard(&summary.uid).await {
                Ok(dashboard) => Some(dashboard),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err.into()),
            };

            let wanted = source.dashboard.canonical_pretty();
            let current = existing
                .as_ref()
                .map(|d| d.dashboard.canonical_pretty())
                .unwrap_or_default();
            if current == wanted {
                continue;
            }

            let old_header = format!("a/{}.json", summary.uid);
            let new_header = format!("b/{}.json", summary.uid);
            let unified = TextDiff::from_lines(&current, &wanted)
                .unified_diff()
                .header(&old_header, &new_header)
                .context_radius(3)
                .to_string();

            diffs.push(DashboardDiff {
                uid: summary.uid,
                title: source.dashboard.title.clone(),
                src_folder: node.folder_uid.clone(),
                dst_folder: existing.map(|d| d.folder_uid().to_owned()),
                unified_diff: unified,
            });
        }
    }
    Ok(diffs)
}

#[cfg(test)]
mod tests {
    use grafsync_core::memory::InMemoryGrafana;
    use grafsync_core::{DashboardContent, FOLDER_GENERAL};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn identical_dashboards_produce_no_diff() {
        let src = InMemoryGrafana::new();
        let dst = InMemoryGrafana::new();
        let content = DashboardContent::new("d", "D").with_field("refresh", json!("5s"));
        src.update_dashboard(&content, None).await.expect("src");
        dst.update_dashboard(&content, None).await.expect("dst");
        dst.update_dashboard(&content, None).await.expect("dst again");

        let diffs = diff_dashboards(&src, &dst, FOLDER_GENERAL, true)
            .await
            .expect("diff");
        assert!(diffs.is_empty(), "version bumps must not show up: {diffs:?}");
    }

    #[tokio::test]
    async fn changed_and_missing_dashboards_are_diffed() {
        let src = InMemoryGrafana::new();
        let dst = InMemoryGrafana::new();
        src.update_dashboard(
            &DashboardContent::new("changed", "Changed").with_field("refresh", json!("10s")),
            None,
        )
        .await
        .expect("src");
        src.update_dashboard(&DashboardContent::new("missing", "Missing"), None)
            .await
            .expect("src");
        dst.update_dashboard(
            &DashboardContent::new("changed", "Changed").with_field("refresh", json!("5s")),
            None,
        )
        .await
        .expect("dst");

        let diffs = diff_dashboards(&src, &dst, FOLDER_GENERAL, true)
            .await
            .expect("diff");
        assert_eq!(diffs.len(), 2);

        let changed = diffs.iter().find(|d| d.uid == "changed").expect("changed");
        assert!(changed.unified_diff.contains("--- a/changed.json"));
        assert!(changed.unified_diff.contains("+++ b/changed.json"));
        assert!(changed.unified_diff.contains("-  \"refresh\": \"5s\","));
        assert!(changed.unified_diff.contains("+  \"refresh\": \"10s\","));

        let missing = diffs.iter().find(|d| d.uid == "missing").expect("missing");
        assert_eq!(missing.dst_folder, None);
        assert!(missing.unified_diff.contains("+  \"uid\": \"missing\""));
    }
}
