//! Strips the bold marker from every string inside a generated payload.

use serde_json::{Map, Value};

/// The emphasis marker generated text must not contain.
pub const FORBIDDEN_MARKER: &str = "**";

/// Remove every occurrence of [`FORBIDDEN_MARKER`] from `text`.
///
/// Within a run of asterisks pairs are removed left to right, so a run never
/// keeps more than one asterisk and a second pass changes nothing.
pub fn strip_marker(text: &str) -> String {
    text.replace(FORBIDDEN_MARKER, "")
}

/// Return a copy of `value` with the marker stripped from all string leaves.
///
/// Arrays keep their order and length, objects keep their key set (keys are
/// not touched), numbers, booleans and null pass through unchanged.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_marker(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), sanitize(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}
