//! Path navigation: stepping through a sequence of steps, applying
//! predicates at each step, and the `{}`/`^()` grouping and sorting
//! operators that wrap a path expression.

use std::collections::HashMap;

use crate::ast::{Node, NodeKind, ObjectLiteral};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::position::Position;
use crate::value::{self, ArrayFlags, Object, Value};

use super::sort::stable_sort_by;
use super::Evaluator;

/// Evaluates a sequence of path steps against `context`, flattening one
/// level at each step and unwrapping a trailing singleton unless any step
/// carried a `[]` forcing `keep_array`.
pub(super) fn eval_path(ev: &mut Evaluator, steps: &[Node], context: &Value, env: &Environment) -> Result<Value> {
    if steps.is_empty() {
        return Ok(Value::Undefined);
    }

    let mut current: Vec<Value> = match context {
        Value::Undefined => return Ok(Value::Undefined),
        other if other.is_sequence() => other.members(),
        other => vec![other.clone()],
    };

    let mut keep_array_overall = false;
    let last = steps.len() - 1;

    for (i, step) in steps.iter().enumerate() {
        let mut next: Vec<Value> = vec![];

        for (idx, item) in current.iter().enumerate() {
            let step_env = if step.focus.is_some() || step.index.is_some() {
                env.child()
            } else {
                env.clone()
            };
            if let Some(name) = &step.index {
                step_env.bind(name.as_str(), Value::Number(idx as f64));
            }

            let result = eval_step(ev, step, item, &step_env)?;

            if let Some(name) = &step.focus {
                step_env.bind(name.as_str(), result.clone());
            }

            if step.cons_array {
                next.push(result);
            } else {
                Value::push_flatten(&mut next, result);
            }
        }

        if !step.predicates.is_empty() {
            next = apply_predicates(ev, &step.predicates, next, env)?;
        }

        if step.keep_array {
            keep_array_overall = true;
        }

        current = next;
        if current.is_empty() && i != last {
            break;
        }
    }

    Ok(Value::sequence_from(current, keep_array_overall))
}

/// Evaluates one step's own node kind against a single context item (field
/// access, wildcard, parent reference, or an arbitrary sub-expression).
fn eval_step(ev: &mut Evaluator, step: &Node, item: &Value, env: &Environment) -> Result<Value> {
    match &step.kind {
        NodeKind::Name(name) => Ok(field_access(item, name)),
        NodeKind::Wildcard => Ok(wildcard(item)),
        NodeKind::DescendantWildcard => Ok(descendants(item)),
        NodeKind::Parent => Ok(Value::Undefined),
        _ => ev.evaluate(step, item, env),
    }
}

fn field_access(item: &Value, name: &str) -> Value {
    match item {
        Value::Object(o) => o
            .entries
            .borrow()
            .get(name)
            .cloned()
            .map(Value::as_path_member)
            .unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

fn wildcard(item: &Value) -> Value {
    match item {
        Value::Object(o) => {
            let values = o.entries.borrow().values().cloned().collect();
            Value::array(values, ArrayFlags::SEQUENCE)
        }
        _ => Value::Undefined,
    }
}

/// `**`: every descendant value reachable from `item`, depth-first,
/// including `item`'s own direct field/array values but not `item` itself.
fn descendants(item: &Value) -> Value {
    let mut out = vec![];
    collect_descendants(item, &mut out);
    Value::array(out, ArrayFlags::SEQUENCE)
}

fn collect_descendants(item: &Value, out: &mut Vec<Value>) {
    match item {
        Value::Object(o) => {
            for v in o.entries.borrow().values() {
                out.push(v.clone());
                collect_descendants(v, out);
            }
        }
        Value::Array(a) => {
            for v in a.items.borrow().iter() {
                out.push(v.clone());
                collect_descendants(v, out);
            }
        }
        _ => {}
    }
}

/// Applies `[predicate]` filters attached to a step. A numeric predicate is
/// a positional index (1-based from the end for negatives, per
/// `array[-1]` meaning "last"); any other predicate is a boolean filter
/// evaluated with each candidate as context.
fn apply_predicates(ev: &mut Evaluator, predicates: &[Node], items: Vec<Value>, env: &Environment) -> Result<Vec<Value>> {
    let mut current = items;
    for predicate in predicates {
        let len = current.len() as i64;
        let mut kept = vec![];
        for (idx, item) in current.iter().enumerate() {
            let result = ev.evaluate(predicate, item, env)?;
            if is_numeric_predicate(&result) {
                let wanted = normalize_index(result.as_f64().unwrap(), len);
                if wanted == Some(idx as i64) {
                    kept.push(item.clone());
                }
            } else if value::is_truthy(&result) {
                kept.push(item.clone());
            }
        }
        current = kept;
    }
    Ok(current)
}

fn is_numeric_predicate(v: &Value) -> bool {
    matches!(v, Value::Number(_))
}

/// Converts a predicate index (possibly negative, possibly fractional) to a
/// zero-based array index, or `None` if it's out of range.
fn normalize_index(n: f64, len: i64) -> Option<i64> {
    let n = n.trunc() as i64;
    let idx = if n < 0 { len + n } else { n };
    if idx >= 0 && idx < len {
        Some(idx)
    } else {
        None
    }
}

/// `expr{key:value, ...}`: groups the items of `expr`'s result sequence by
/// the evaluated keys, then evaluates each pair's value expression once per
/// group against the whole matching subsequence as context.
pub(super) fn eval_group_by(
    ev: &mut Evaluator,
    inner: &Node,
    pairs: &ObjectLiteral,
    context: &Value,
    env: &Environment,
) -> Result<Value> {
    let seq = ev.evaluate(inner, context, env)?;
    let items = seq.members();

    let mut order: Vec<String> = vec![];
    let mut groups: HashMap<String, (usize, Vec<Value>)> = HashMap::new();

    for item in &items {
        let mut seen_this_item: HashMap<String, usize> = HashMap::new();
        for (pair_idx, (key_node, _)) in pairs.iter().enumerate() {
            let key_val = ev.evaluate(key_node, item, env)?;
            if key_val.is_undefined() {
                continue;
            }
            let key = key_val
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| Error::T1003NonStringKey(key_node.position, format!("{:?}", key_val)))?;

            if let Some(&prev_idx) = seen_this_item.get(&key) {
                if prev_idx != pair_idx {
                    return Err(Box::new(Error::D1009MultipleKeys(key_node.position, key)));
                }
            }
            seen_this_item.insert(key.clone(), pair_idx);

            match groups.get_mut(&key) {
                Some((existing_idx, matched)) => {
                    if *existing_idx != pair_idx {
                        return Err(Box::new(Error::D1009MultipleKeys(key_node.position, key)));
                    }
                    matched.push(item.clone());
                }
                None => {
                    order.push(key.clone());
                    groups.insert(key, (pair_idx, vec![item.clone()]));
                }
            }
        }
    }

    let mut entries = Object::new();
    for key in order {
        let (pair_idx, matched) = groups.remove(&key).unwrap();
        let value_node = &pairs[pair_idx].1;
        let group_context = Value::sequence_from(matched, false);
        let value = ev.evaluate(value_node, &group_context, env)?;
        entries.insert(key, value);
    }
    Ok(Value::object(entries))
}

/// `expr^(term, ...)`: a stable sort of `expr`'s result sequence, with each
/// term evaluated once per item (descending for `^>`, ascending for `^<` or
/// bare).
pub(super) fn eval_order_by(
    ev: &mut Evaluator,
    inner: &Node,
    terms: &[(Node, bool)],
    context: &Value,
    env: &Environment,
    position: Position,
) -> Result<Value> {
    let seq = ev.evaluate(inner, context, env)?;
    let items = seq.members();

    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let mut keys = Vec::with_capacity(terms.len());
        for (expr, _) in terms {
            keys.push(ev.evaluate(expr, &item, env)?);
        }
        keyed.push((keys, item));
    }

    let sorted = stable_sort_by(keyed, |(a_keys, _), (b_keys, _)| {
        for (i, (_, descending)) in terms.iter().enumerate() {
            let ordering = value::compare(&a_keys[i], &b_keys[i])
                .ok_or_else(|| Error::D3070InvalidDefaultSort(position))?;
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != std::cmp::Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(std::cmp::Ordering::Equal)
    })?;

    let items: Vec<Value> = sorted.into_iter().map(|(_, item)| item).collect();
    Ok(Value::sequence_from(items, false))
}
