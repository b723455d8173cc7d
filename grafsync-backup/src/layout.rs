//! On-disk backup layout and the atomic JSON writer.
//!
//! # Storage layout
//!
//! ```text
//! <backup>/
//!   folders/<uid>.json      folder record (uid, title, parentUid)
//!   dashboards/<uid>.json   {dashboard, meta: {folderUid}}
//!   manifest.json           fingerprints of the dashboards last written
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{io_err, json_err, BackupError};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

pub fn folders_dir_at(root: &Path) -> PathBuf {
    root.join("folders")
}

pub fn dashboards_dir_at(root: &Path) -> PathBuf {
    root.join("dashboards")
}

pub fn folder_path_at(root: &Path, uid: &str) -> PathBuf {
    folders_dir_at(root).join(format!("{uid}.json"))
}

pub fn dashboard_path_at(root: &Path, uid: &str) -> PathBuf {
    dashboards_dir_at(root).join(format!("{uid}.json"))
}

pub fn manifest_path_at(root: &Path) -> PathBuf {
    root.join("manifest.json")
}

/// Uids of every `*.json` file in `dir`, sorted. A missing directory is empty.
pub fn list_uids(dir: &Path) -> Result<Vec<String>, BackupError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_err(dir, err)),
    };
    let mut uids: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    uids.sort();
    Ok(uids)
}

// ---------------------------------------------------------------------------
// 2. JSON files
// ---------------------------------------------------------------------------

/// Read and parse a JSON file; a missing file is [`BackupError::BackupNotFound`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BackupError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(BackupError::BackupNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(io_err(path, err)),
    };
    serde_json::from_str(&contents).map_err(|e| json_err(path, e))
}

/// Pretty-print `value` to `path` via `<path>.tmp` and a rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), BackupError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|e| json_err(path, e))?;
    json.push('\n');

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Manifest
// ---------------------------------------------------------------------------

/// What was last written for one dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// SHA-256 of the canonical dashboard content.
    pub fingerprint: String,
    pub folder_uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub backed_up_at: DateTime<Utc>,
    #[serde(default)]
    pub dashboards: BTreeMap<String, ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            backed_up_at: Utc::now(),
            dashboards: BTreeMap::new(),
        }
    }
}

/// Load the manifest under `root`; an absent one is empty.
pub fn load_manifest_at(root: &Path) -> Result<Manifest, BackupError> {
    let path = manifest_path_at(root);
    if !path.exists() {
        return Ok(Manifest::default());
    }
    read_json(&path)
}

pub fn save_manifest_at(root: &Path, manifest: &Manifest) -> Result<(), BackupError> {
    write_json_atomic(&manifest_path_at(root), manifest)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn atomic_write_leaves_no_tmp_and_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = folder_path_at(tmp.path(), "ops");
        write_json_atomic(&path, &json!({"uid": "ops"})).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        let back: Value = read_json(&path).unwrap();
        assert_eq!(back["uid"], "ops");
    }

    #[test]
    fn missing_file_is_backup_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = read_json::<Value>(&dashboard_path_at(tmp.path(), "nope")).unwrap_err();
        assert!(matches!(err, BackupError::BackupNotFound { .. }), "got: {err}");
    }

    #[test]
    fn list_uids_ignores_other_files() {
        let tmp = TempDir::new().unwrap();
        let dir = folders_dir_at(tmp.path());
        assert!(list_uids(&dir).unwrap().is_empty());

        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.json", "a.json", "notes.txt", "c.json.tmp"] {
            std::fs::write(dir.join(name), "{}").unwrap();
        }
        assert_eq!(list_uids(&dir).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn manifest_defaults_when_absent_and_survives_save() {
        let tmp = TempDir::new().unwrap();
        let mut manifest = load_manifest_at(tmp.path()).unwrap();
        assert!(manifest.dashboards.is_empty());

        manifest.dashboards.insert(
            "d".into(),
            ManifestEntry {
                fingerprint: "abc".into(),
                folder_uid: "general".into(),
            },
        );
        save_manifest_at(tmp.path(), &manifest).unwrap();
        assert_eq!(load_manifest_at(tmp.path()).unwrap(), manifest);
    }
}
