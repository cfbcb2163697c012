//! Shared fixtures for integration tests

use serde_json::{json, Value};

/// Wrap a JSON document in the XSSI guard prefix
pub fn guarded(value: &Value) -> String {
    format!(")]}}'\n{value}")
}

/// Wrap an inner document in a guarded batch RPC envelope
#[allow(dead_code)]
pub fn batch_envelope(rpc_id: &str, inner: &Value) -> String {
    let outer = json!([["wrb.fr", rpc_id, inner.to_string()]]);
    guarded(&outer)
}

/// A single-timeline payload with one entry per (time, values) pair
pub fn timeline_payload(rows: &[(i64, Vec<u64>)]) -> Value {
    let entries: Vec<Value> = rows
        .iter()
        .map(|(time, values)| json!({ "time": time.to_string(), "value": values }))
        .collect();
    json!({ "default": { "timelineData": entries } })
}

/// An embed page carrying a widget document in a script blob
#[allow(dead_code)]
pub fn embed_page(widget: &Value) -> String {
    format!("<html><script>var w = JSON.parse('{widget}');</script></html>")
}
