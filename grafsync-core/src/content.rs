//! Canonical form of dashboard content.
//!
//! Two dashboards are "the same" when their canonical forms are equal: the
//! volatile `id` and `version` fields are dropped and every object's keys are
//! sorted, so field order and server bookkeeping never cause a rewrite.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::types::DashboardContent;

/// Fields assigned by the server on every write.
pub const VOLATILE_FIELDS: [&str; 2] = ["id", "version"];

/// Recursively rebuild `value` with object keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

impl DashboardContent {
    /// Canonical JSON with volatile top-level fields removed.
    pub fn canonical(&self) -> Value {
        let mut map = self.fields.clone();
        for field in VOLATILE_FIELDS {
            map.remove(field);
        }
        map.insert("uid".into(), Value::String(self.uid.clone()));
        map.insert("title".into(), Value::String(self.title.clone()));
        canonicalize(&Value::Object(map))
    }

    /// Content equality ignoring `id` and `version`.
    pub fn content_eq(&self, other: &DashboardContent) -> bool {
        self.canonical() == other.canonical()
    }

    /// SHA-256 hex digest of the canonical JSON.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Pretty-printed canonical JSON, stable across runs.
    pub fn canonical_pretty(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.canonical()).unwrap_or_default();
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn content(value: Value) -> DashboardContent {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    #[case::id_differs(
        json!({"uid": "d", "title": "T", "id": 1}),
        json!({"uid": "d", "title": "T", "id": 99}),
        true
    )]
    #[case::version_differs(
        json!({"uid": "d", "title": "T", "version": 1}),
        json!({"uid": "d", "title": "T", "version": 8}),
        true
    )]
    #[case::key_order_differs(
        json!({"uid": "d", "title": "T", "panels": [{"a": 1, "b": 2}], "tags": []}),
        json!({"tags": [], "panels": [{"b": 2, "a": 1}], "title": "T", "uid": "d"}),
        true
    )]
    #[case::title_differs(
        json!({"uid": "d", "title": "T"}),
        json!({"uid": "d", "title": "U"}),
        false
    )]
    #[case::nested_value_differs(
        json!({"uid": "d", "title": "T", "panels": [{"id": 1}]}),
        json!({"uid": "d", "title": "T", "panels": [{"id": 2}]}),
        false
    )]
    #[case::array_order_matters(
        json!({"uid": "d", "title": "T", "tags": ["a", "b"]}),
        json!({"uid": "d", "title": "T", "tags": ["b", "a"]}),
        false
    )]
    fn content_equality(#[case] left: Value, #[case] right: Value, #[case] equal: bool) {
        let left = content(left);
        let right = content(right);
        assert_eq!(left.content_eq(&right), equal);
        assert_eq!(left.fingerprint() == right.fingerprint(), equal);
    }

    #[test]
    fn nested_panel_ids_are_not_volatile() {
        let dash = content(json!({"uid": "d", "title": "T", "id": 3, "panels": [{"id": 5}]}));
        let canonical = dash.canonical();
        assert!(canonical.get("id").is_none());
        assert_eq!(canonical["panels"][0]["id"], 5);
    }

    #[test]
    fn canonical_pretty_sorts_keys() {
        let dash = content(json!({"uid": "d", "title": "T", "b": 1, "a": 2}));
        let text = dash.canonical_pretty();
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        assert!(a < b);
        assert!(text.ends_with('\n'));
    }
}
