use serde_json::{Map, Value};

/// One record returned by the backend for a level.
///
/// Keys keep the order the backend serialized them in (serde_json is built
/// with `preserve_order`), which is what the displayed column order follows.
pub type Row = Map<String, Value>;

/// Render a cell as plain text. Missing and null cells render empty.
pub fn cell_text(row: &Row, key: &str) -> String {
    match row.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(value) => value_text(value),
    }
}

pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Parse a JSON array of objects into rows, skipping anything that is not an object.
pub fn rows_from_value(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(obj),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
