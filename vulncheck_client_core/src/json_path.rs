//! Nil-safe dotted-path extraction over JSON values
//!
//! Response payloads are traversed with paths like `data.results` or
//! `data.0.cve`. Missing keys, out-of-range indices, and scalar dead ends
//! all yield `None` instead of panicking.

use serde_json::Value;

/// Walk a dotted path through a JSON value
///
/// Object segments are looked up by key; array segments by numeric index.
/// An empty path returns the value itself.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vulncheck_client_core::json_path::get_path;
///
/// let body = json!({"data": {"results": [{"id": "x"}]}});
/// assert_eq!(get_path(&body, "data.results.0.id"), Some(&json!("x")));
/// assert_eq!(get_path(&body, "data.missing"), None);
/// ```
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Length of the array at `path`, or zero when absent or not an array
pub fn array_len_at(value: &Value, path: &str) -> usize {
    get_path(value, path)
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}
