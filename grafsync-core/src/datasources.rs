//! Datasource references inside a dashboard model.
//!
//! References are collected from panels (including panels nested in rows),
//! panel targets, and templating variables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DashboardContent;

/// A `{type, uid}` datasource reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceRef {
    #[serde(default, rename = "type")]
    pub kind: String,
    pub uid: String,
}

impl DataSourceRef {
    /// `true` for `${var}` references resolved through a dashboard variable.
    pub fn is_variable(&self) -> bool {
        self.uid.starts_with("${") && self.uid.ends_with('}')
    }
}

fn push_ref(value: Option<&Value>, out: &mut Vec<DataSourceRef>) {
    let Some(value) = value else { return };
    if !value.is_object() {
        return;
    }
    if let Ok(reference) = serde_json::from_value::<DataSourceRef>(value.clone()) {
        out.push(reference);
    }
}

fn collect_panel(panel: &Value, out: &mut Vec<DataSourceRef>) {
    push_ref(panel.get("datasource"), out);
    if let Some(targets) = panel.get("targets").and_then(Value::as_array) {
        for target in targets {
            push_ref(target.get("datasource"), out);
        }
    }
    if let Some(children) = panel.get("panels").and_then(Value::as_array) {
        for child in children {
            collect_panel(child, out);
        }
    }
}

impl DashboardContent {
    /// Every datasource reference in document order.
    pub fn datasources(&self) -> Vec<DataSourceRef> {
        let mut out = Vec::new();
        if let Some(panels) = self.fields.get("panels").and_then(Value::as_array) {
            for panel in panels {
                collect_panel(panel, &mut out);
            }
        }
        let variables = self
            .fields
            .get("templating")
            .and_then(|t| t.get("list"))
            .and_then(Value::as_array);
        if let Some(variables) = variables {
            for variable in variables {
                push_ref(variable.get("datasource"), &mut out);
            }
        }
        out
    }

    pub fn datasource_count(&self) -> usize {
        self.datasources().len()
    }

    pub fn variable_datasource_count(&self) -> usize {
        self.datasources().iter().filter(|d| d.is_variable()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn dashboard(value: Value) -> DashboardContent {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    #[case::no_panels(json!({"uid": "d", "title": "t"}), 0, 0)]
    #[case::fixed_datasources(
        json!({
            "uid": "d", "title": "t",
            "panels": [{
                "datasource": {"type": "prometheus", "uid": "prom1"},
                "targets": [{"datasource": {"type": "prometheus", "uid": "prom1"}}]
            }]
        }),
        2,
        0
    )]
    #[case::variable_datasources(
        json!({
            "uid": "d", "title": "t",
            "panels": [{
                "datasource": {"type": "prometheus", "uid": "${DS}"},
                "targets": [{"datasource": {"type": "prometheus", "uid": "${DS}"}}]
            }]
        }),
        2,
        2
    )]
    #[case::rows_and_templating(
        json!({
            "uid": "d", "title": "t",
            "panels": [{
                "type": "row",
                "panels": [{"datasource": {"type": "loki", "uid": "${logs}"}}]
            }],
            "templating": {"list": [
                {"type": "query", "datasource": {"type": "prometheus", "uid": "prom1"}},
                {"type": "custom"}
            ]}
        }),
        2,
        1
    )]
    #[case::legacy_string_datasource_ignored(
        json!({"uid": "d", "title": "t", "panels": [{"datasource": "Prometheus"}]}),
        0,
        0
    )]
    fn counts_datasources(#[case] value: Value, #[case] total: usize, #[case] variables: usize) {
        let dash = dashboard(value);
        assert_eq!(dash.datasource_count(), total);
        assert_eq!(dash.variable_datasource_count(), variables);
    }
}
