//! Rendering lifecycle results and bundle summaries for the CLI.

use serde_json::{json, Value};

use lcaio_core::{LifecycleResults, MatDict, MatValue};
use lcaio_types::LabeledVector;

/// `[{"label": [...], "value": x}, ...]` in index order.
pub fn vector_to_json(v: &LabeledVector) -> Value {
    Value::Array(
        v.iter()
            .map(|(label, value)| json!({ "label": label, "value": value }))
            .collect(),
    )
}

pub fn results_to_json(results: &LifecycleResults) -> Value {
    json!({
        "production": vector_to_json(&results.production),
        "emissions": vector_to_json(&results.emissions),
        "impacts": results.impacts.as_ref().map(vector_to_json),
    })
}

/// One `label<TAB>value` line per entry under a `# title` line.
pub fn format_vector(title: &str, v: &LabeledVector) -> String {
    let mut out = format!("# {}\n", title);
    for (label, value) in v.iter() {
        out.push_str(&format!("{}\t{}\n", label, value));
    }
    out
}

pub fn format_results(results: &LifecycleResults) -> String {
    let mut out = format_vector("production", &results.production);
    out.push_str(&format_vector("emissions", &results.emissions));
    if let Some(impacts) = &results.impacts {
        out.push_str(&format_vector("impacts", impacts));
    }
    out
}

fn describe(value: &MatValue) -> (String, usize, usize) {
    match value {
        MatValue::Array(a) => ("array".to_string(), a.nrows, a.ncols),
        MatValue::Table(rows) => (
            "table".to_string(),
            rows.len(),
            rows.first().map(Vec::len).unwrap_or(0),
        ),
    }
}

pub fn bundle_to_json(dict: &MatDict) -> Value {
    Value::Array(
        dict.keys()
            .filter_map(|k| dict.get(k).map(|v| (k, describe(v))))
            .map(|(k, (kind, r, c))| json!({ "key": k, "kind": kind, "shape": [r, c] }))
            .collect(),
    )
}

pub fn format_bundle(dict: &MatDict) -> String {
    let mut out = String::new();
    for key in dict.keys() {
        if let Some(value) = dict.get(key) {
            let (kind, r, c) = describe(value);
            out.push_str(&format!("{:<12} {:<6} {}x{}\n", key, kind, r, c));
        }
    }
    out
}
