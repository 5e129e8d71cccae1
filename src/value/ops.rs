use std::cmp::Ordering;

use super::Value;

/// JSONata truthiness: falsy values are `undefined`, `null`, `false`, `0`,
/// `""`, an empty array, and an empty object; everything else (including
/// functions) is truthy. A single-element array defers to its element; a
/// longer array is truthy if *any* element is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Undefined => false,
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => {
            let items = a.items.borrow();
            if items.len() == 1 {
                is_truthy(&items[0])
            } else {
                items.iter().any(is_truthy)
            }
        }
        Value::Object(o) => !o.entries.borrow().is_empty(),
        Value::Lambda(_) | Value::NativeFn(_) | Value::Partial(_) | Value::Regex(_) => true,
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Lambda(_) | Value::NativeFn(_) | Value::Partial(_) => "function",
        Value::Regex(_) => "regex",
    }
}

/// Structural equality used by `=`/`!=`. Two `undefined` values are never
/// equal to anything, including each other; callers evaluating `=`/`!=`
/// should special-case undefined operands before calling this.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, _) | (_, Value::Undefined) => false,
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            let x = x.items.borrow();
            let y = y.items.borrow();
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            let x = x.entries.borrow();
            let y = y.entries.borrow();
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map_or(false, |v2| deep_equal(v, v2)))
        }
        (Value::Lambda(x), Value::Lambda(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::NativeFn(x), Value::NativeFn(y)) => std::rc::Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// Ordering for `<`, `<=`, `>`, `>=` and the default `$sort`. `None` means
/// the two values cannot be compared (different, non-numeric/string types).
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
