//! Domain types for folders and dashboards.
//!
//! Field names follow the Grafana HTTP API (`camelCase` on the wire).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Root sentinel
// ---------------------------------------------------------------------------

/// Reserved identifier of the virtual top-level folder.
pub const FOLDER_GENERAL: &str = "general";

/// Virtual folder newer Grafana versions list at the top level.
pub const FOLDER_SHARED_WITH_ME: &str = "sharedwithme";

/// `true` for every spelling of "the root": no parent, empty parent, `general`.
pub fn is_general(uid: Option<&str>) -> bool {
    matches!(uid, None | Some("") | Some(FOLDER_GENERAL))
}

/// Collapse the root spellings into [`FOLDER_GENERAL`].
pub fn general_or(uid: Option<&str>) -> &str {
    match uid {
        Some(uid) if !is_general(Some(uid)) => uid,
        _ => FOLDER_GENERAL,
    }
}

/// Collapse the root spellings into `None`, the form write calls expect.
pub fn none_if_general(uid: Option<&str>) -> Option<&str> {
    if is_general(uid) {
        None
    } else {
        uid
    }
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

/// A folder record as returned by the folder endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub uid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl Folder {
    /// Parent uid with the root collapsed to [`FOLDER_GENERAL`].
    pub fn parent_or_general(&self) -> &str {
        general_or(self.parent_uid.as_deref())
    }
}

/// Arguments of an `update_folder` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FolderUpdate {
    pub title: String,
    /// Current version; required unless `overwrite` is set.
    pub version: Option<u64>,
    /// `None` keeps the current parent, `Some(None)` moves to the root.
    pub parent_uid: Option<Option<String>>,
    pub overwrite: bool,
}

impl FolderUpdate {
    /// Title-only update that ignores the version check.
    pub fn retitle(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            overwrite: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

/// One hit of the dashboard search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub uid: String,
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_title: Option<String>,
}

/// The dashboard model itself.
///
/// Only `uid` and `title` are interpreted; everything else travels in
/// `fields`. `id` and `version` are server-assigned and volatile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardContent {
    pub uid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DashboardContent {
    pub fn new(uid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            id: None,
            version: None,
            fields: Map::new(),
        }
    }

    /// Builder-style setter for an opaque field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Copy without the volatile `id`, as sent in write payloads.
    pub fn without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }
}

/// Metadata returned next to a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_title: Option<String>,
}

/// A dashboard with its metadata (`GET /api/dashboards/uid/:uid`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub dashboard: DashboardContent,
    #[serde(default)]
    pub meta: DashboardMeta,
}

impl Dashboard {
    /// Containing folder with the root collapsed to [`FOLDER_GENERAL`].
    pub fn folder_uid(&self) -> &str {
        general_or(self.meta.folder_uid.as_deref())
    }
}

/// Result of a create-or-overwrite dashboard write.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardWriteResult {
    pub uid: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub url: String,
}
