//! Tag attributes: string-keyed JSON metadata attached to a tag

use serde_json::{Map, Value};

/// Attribute dictionary of one tag
pub type Attributes = Map<String, Value>;

/// Merge `new` into `target`
///
/// Object values are updated key by key, array values are extended, and
/// anything else (scalars, or values of a different kind) is replaced.
pub fn merge_attributes(target: &mut Attributes, new: Attributes) {
    for (name, value) in new {
        match (target.get_mut(&name), value) {
            (Some(Value::Object(existing)), Value::Object(update)) => {
                existing.extend(update);
            }
            (Some(Value::Array(existing)), Value::Array(more)) => {
                existing.extend(more);
            }
            (_, value) => {
                target.insert(name, value);
            }
        }
    }
}

/// Scalar attribute values rendered as plain strings; `None` for arrays and objects
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
