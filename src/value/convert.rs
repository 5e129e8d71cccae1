//! Conversion at the JSON boundary. Internally, `Value` is a richer type
//! than JSON (it also represents functions and compiled regexes); those
//! variants have no JSON representation and are dropped when serializing,
//! matching how the reference implementation drops function-valued results.

use super::{ArrayFlags, Object, Value};

pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s.as_str()),
        serde_json::Value::Array(items) => {
            Value::array(items.iter().map(from_json).collect(), ArrayFlags::empty())
        }
        serde_json::Value::Object(map) => {
            let mut entries = Object::new();
            for (k, v) in map {
                entries.insert(k.clone(), from_json(v));
            }
            Value::object(entries)
        }
    }
}

/// Converts a runtime value back to JSON. Returns `None` for values with no
/// JSON representation (functions, regexes); array/object members of that
/// kind are silently dropped, as the reference implementation does.
pub fn to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Undefined => None,
        Value::Null => Some(serde_json::Value::Null),
        Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Value::Number(n) => Some(
            serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        ),
        Value::String(s) => Some(serde_json::Value::String(s.to_string())),
        Value::Array(a) => Some(serde_json::Value::Array(
            a.items.borrow().iter().filter_map(to_json).collect(),
        )),
        Value::Object(o) => {
            let mut map = serde_json::Map::new();
            for (k, v) in o.entries.borrow().iter() {
                if let Some(v) = to_json(v) {
                    map.insert(k.clone(), v);
                }
            }
            Some(serde_json::Value::Object(map))
        }
        Value::Lambda(_) | Value::NativeFn(_) | Value::Partial(_) | Value::Regex(_) => None,
    }
}
