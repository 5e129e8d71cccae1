//! The builtin function library, bound into the root [`Environment`] under
//! their `$name` by [`register_builtins`]. Each implementation has the
//! [`crate::value::NativeFnImpl`] shape so it can be called the same way as
//! a user lambda or a partial application.

use std::rc::Rc;

use rand::Rng;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::position::Position;
use crate::value::{self, ArrayFlags, NativeFnValue, Object, Value};

use super::call::call_with_arity;
use super::Evaluator;

type Args<'a> = &'a [Value];

fn arg(args: Args, i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

macro_rules! builtin {
    ($name:literal, $arity:expr, $func:path) => {
        ($name, $arity, $func as crate::value::NativeFnImpl)
    };
}

pub fn register_builtins(env: &Environment) {
    const TABLE: &[(&str, Option<usize>, crate::value::NativeFnImpl)] = &[
        builtin!("number", Some(1), fn_number),
        builtin!("string", Some(2), fn_string),
        builtin!("boolean", Some(1), fn_boolean),
        builtin!("not", Some(1), fn_not),
        builtin!("exists", Some(1), fn_exists),
        builtin!("abs", Some(1), fn_abs),
        builtin!("floor", Some(1), fn_floor),
        builtin!("ceil", Some(1), fn_ceil),
        builtin!("round", Some(2), fn_round),
        builtin!("power", Some(2), fn_power),
        builtin!("sqrt", Some(1), fn_sqrt),
        builtin!("random", Some(0), fn_random),
        builtin!("formatNumber", Some(3), fn_format_number),
        builtin!("formatBase", Some(2), fn_format_base),
        builtin!("sum", Some(1), fn_sum),
        builtin!("max", Some(1), fn_max),
        builtin!("min", Some(1), fn_min),
        builtin!("average", Some(1), fn_average),
        builtin!("length", Some(1), fn_length),
        builtin!("substring", Some(3), fn_substring),
        builtin!("substringBefore", Some(2), fn_substring_before),
        builtin!("substringAfter", Some(2), fn_substring_after),
        builtin!("uppercase", Some(1), fn_uppercase),
        builtin!("lowercase", Some(1), fn_lowercase),
        builtin!("trim", Some(1), fn_trim),
        builtin!("pad", Some(3), fn_pad),
        builtin!("contains", Some(2), fn_contains),
        builtin!("split", Some(3), fn_split),
        builtin!("join", Some(2), fn_join),
        builtin!("replace", Some(4), fn_replace),
        builtin!("match", Some(3), fn_match),
        builtin!("eval", Some(2), fn_eval),
        builtin!("base64encode", Some(1), fn_base64_encode),
        builtin!("base64decode", Some(1), fn_base64_decode),
        builtin!("count", Some(1), fn_count),
        builtin!("append", Some(2), fn_append),
        builtin!("sort", Some(2), fn_sort),
        builtin!("reverse", Some(1), fn_reverse),
        builtin!("distinct", Some(1), fn_distinct),
        builtin!("zip", None, fn_zip),
        builtin!("shuffle", Some(1), fn_shuffle),
        builtin!("keys", Some(1), fn_keys),
        builtin!("lookup", Some(2), fn_lookup),
        builtin!("merge", Some(1), fn_merge),
        builtin!("spread", Some(1), fn_spread),
        builtin!("each", Some(2), fn_each),
        builtin!("sift", Some(2), fn_sift),
        builtin!("map", Some(2), fn_map),
        builtin!("filter", Some(2), fn_filter),
        builtin!("reduce", Some(3), fn_reduce),
        builtin!("single", Some(2), fn_single),
        builtin!("type", Some(1), fn_type),
        builtin!("now", Some(0), fn_now),
        builtin!("millis", Some(0), fn_millis),
        builtin!("fromMillis", Some(3), fn_from_millis),
        builtin!("toMillis", Some(2), fn_to_millis),
        builtin!("error", Some(1), fn_error),
        builtin!("assert", Some(2), fn_assert),
    ];

    for (name, arity, implementation) in TABLE {
        env.bind(
            *name,
            Value::NativeFn(Rc::new(NativeFnValue {
                name: *name,
                arity: *arity,
                implementation: *implementation,
            })),
        );
    }
}

/// Implicit string conversion used by the `&` concatenation operator:
/// `undefined` contributes nothing, functions contribute nothing, compound
/// values are rendered as JSON text.
pub fn stringify(v: &Value) -> String {
    match v {
        Value::Undefined => String::new(),
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.to_string(),
        Value::Array(_) | Value::Object(_) => value::to_json(v)
            .map(|j| j.to_string())
            .unwrap_or_default(),
        Value::Lambda(_) | Value::NativeFn(_) | Value::Partial(_) | Value::Regex(_) => String::new(),
    }
}

pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let mut buf = Vec::new();
    dtoa::write(&mut buf, n).expect("dtoa writes to a Vec never fail");
    String::from_utf8(buf).expect("dtoa output is ASCII")
}

fn as_number(v: &Value, position: Position) -> Result<f64> {
    v.as_f64()
        .ok_or_else(|| Box::new(Error::D3030CannotCastToNumber(position, format!("{:?}", v))))
}

fn as_string(v: &Value, position: Position, func: &str, index: usize) -> Result<String> {
    v.as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Box::new(Error::T0410ArgumentNotValid(position, index, func.into())))
}

// -- type conversion / predicates --------------------------------------------

fn fn_number(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    match arg(args, 0) {
        Value::Undefined => Ok(Value::Undefined),
        Value::Number(n) => Ok(Value::Number(n)),
        Value::Bool(b) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| Box::new(Error::D3030CannotCastToNumber(position, s.to_string()))),
        other => Err(Box::new(Error::D3030CannotCastToNumber(position, format!("{:?}", other)))),
    }
}

fn fn_string(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    if v.is_function() {
        return Err(Box::new(Error::T0410ArgumentNotValid(position, 1, "string".into())));
    }
    let pretty = value::is_truthy(&arg(args, 1));
    if pretty {
        if let Some(json) = value::to_json(&v) {
            return Ok(Value::string(
                serde_json::to_string_pretty(&json).unwrap_or_default(),
            ));
        }
    }
    Ok(Value::string(stringify(&v)))
}

fn fn_boolean(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    Ok(Value::Bool(value::is_truthy(&v)))
}

fn fn_not(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    Ok(Value::Bool(!value::is_truthy(&v)))
}

fn fn_exists(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    Ok(Value::Bool(!arg(args, 0).is_undefined()))
}

fn fn_type(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    Ok(Value::string(value::type_name(&v)))
}

// -- numeric ------------------------------------------------------------------

fn fn_abs(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    Ok(Value::Number(as_number(&v, position)?.abs()))
}

fn fn_floor(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    Ok(Value::Number(as_number(&v, position)?.floor()))
}

fn fn_ceil(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    Ok(Value::Number(as_number(&v, position)?.ceil()))
}

/// Banker's rounding (round-half-to-even), matching the reference
/// implementation's `$round` rather than the usual round-half-away-from-zero.
fn fn_round(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let n = as_number(&v, position)?;
    let precision = match arg(args, 1) {
        Value::Undefined => 0,
        p => as_number(&p, position)? as i32,
    };
    Ok(Value::Number(round_half_even(n, precision)))
}

fn round_half_even(n: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    let scaled = n * factor;
    let floor = scaled.floor();
    let diff = scaled - floor;
    let rounded = if (diff - 0.5).abs() < 1e-9 {
        if (floor as i64).rem_euclid(2) == 0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };
    rounded / factor
}

fn fn_power(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let base = arg(args, 0);
    if base.is_undefined() {
        return Ok(Value::Undefined);
    }
    let base = as_number(&base, position)?;
    let exp = as_number(&arg(args, 1), position)?;
    let result = base.powf(exp);
    if !result.is_finite() {
        return Err(Box::new(Error::D3061PowerNotFinite(position, format!("{}^{}", base, exp))));
    }
    Ok(Value::Number(result))
}

fn fn_sqrt(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let n = as_number(&v, position)?;
    if n < 0.0 {
        return Err(Box::new(Error::D3060NegativeSqrt(position, format_number(n))));
    }
    Ok(Value::Number(n.sqrt()))
}

fn fn_random(_ev: &mut Evaluator, _position: Position, _args: Args) -> Result<Value> {
    Ok(Value::Number(rand::thread_rng().gen::<f64>()))
}

fn numbers_of(v: &Value, position: Position) -> Result<Vec<f64>> {
    v.members().iter().map(|m| as_number(m, position)).collect()
}

fn fn_sum(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(numbers_of(&v, position)?.iter().sum()))
}

fn fn_max(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let nums = numbers_of(&v, position)?;
    Ok(nums
        .into_iter()
        .fold(None, |acc, n| Some(acc.map_or(n, |m: f64| m.max(n))))
        .map(Value::Number)
        .unwrap_or(Value::Undefined))
}

fn fn_min(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let nums = numbers_of(&v, position)?;
    Ok(nums
        .into_iter()
        .fold(None, |acc, n| Some(acc.map_or(n, |m: f64| m.min(n))))
        .map(Value::Number)
        .unwrap_or(Value::Undefined))
}

fn fn_average(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let nums = numbers_of(&v, position)?;
    if nums.is_empty() {
        return Ok(Value::Undefined);
    }
    Ok(Value::Number(nums.iter().sum::<f64>() / nums.len() as f64))
}

// -- strings ------------------------------------------------------------------

fn fn_length(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "length", 1)?;
    Ok(Value::Number(s.chars().count() as f64))
}

fn fn_substring(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "substring", 1)?;
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = as_number(&arg(args, 1), position)? as i64;
    let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
    let end = match arg(args, 2) {
        Value::Undefined => len,
        n => {
            let count = as_number(&n, position)? as i64;
            (start + count).clamp(start, len)
        }
    };
    Ok(Value::string(chars[start as usize..end as usize].iter().collect::<String>()))
}

fn fn_substring_before(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "substringBefore", 1)?;
    let needle = as_string(&arg(args, 1), position, "substringBefore", 2)?;
    Ok(Value::string(match s.find(&needle) {
        Some(idx) => s[..idx].to_string(),
        None => s,
    }))
}

fn fn_substring_after(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "substringAfter", 1)?;
    let needle = as_string(&arg(args, 1), position, "substringAfter", 2)?;
    Ok(Value::string(match s.find(&needle) {
        Some(idx) => s[idx + needle.len()..].to_string(),
        None => s,
    }))
}

fn fn_uppercase(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    Ok(Value::string(as_string(&v, position, "uppercase", 1)?.to_uppercase()))
}

fn fn_lowercase(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    Ok(Value::string(as_string(&v, position, "lowercase", 1)?.to_lowercase()))
}

fn fn_trim(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "trim", 1)?;
    let words: Vec<&str> = s.split_whitespace().collect();
    Ok(Value::string(words.join(" ")))
}

fn fn_pad(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "pad", 1)
        .map_err(|_| Box::new(Error::D3020PadFirstArgNotString(position)))?;
    let width = as_number(&arg(args, 1), position)? as i64;
    let pad_char = match arg(args, 2) {
        Value::Undefined => " ".to_string(),
        p => as_string(&p, position, "pad", 3)?,
    };
    let pad_char = pad_char.chars().next().unwrap_or(' ');
    let len = s.chars().count() as i64;
    let amount = (width.abs() - len).max(0) as usize;
    let padding: String = std::iter::repeat(pad_char).take(amount).collect();
    Ok(Value::string(if width >= 0 {
        format!("{}{}", s, padding)
    } else {
        format!("{}{}", padding, s)
    }))
}

fn fn_contains(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Bool(false));
    }
    let s = as_string(&v, position, "contains", 1)?;
    match arg(args, 1) {
        Value::Regex(r) => Ok(Value::Bool(r.compiled.is_match(&s))),
        other => {
            let needle = as_string(&other, position, "contains", 2)?;
            Ok(Value::Bool(s.contains(&needle)))
        }
    }
}

fn fn_split(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "split", 1)?;
    let limit = match arg(args, 2) {
        Value::Undefined => None,
        n => {
            let n = as_number(&n, position)?;
            if n < 0.0 {
                return Err(Box::new(Error::D3040SplitLimitNegative(position)));
            }
            Some(n as usize)
        }
    };
    let mut parts: Vec<Value> = match arg(args, 1) {
        Value::Regex(r) => r.compiled.split(&s).map(Value::string).collect(),
        other => {
            let sep = as_string(&other, position, "split", 2)?;
            if sep.is_empty() {
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::string).collect()
            }
        }
    };
    if let Some(limit) = limit {
        parts.truncate(limit);
    }
    Ok(Value::array(parts, ArrayFlags::SEQUENCE))
}

fn fn_join(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let sep = match arg(args, 1) {
        Value::Undefined => String::new(),
        s => as_string(&s, position, "join", 2)?,
    };
    let strings: Result<Vec<String>> = v
        .members()
        .iter()
        .map(|m| as_string(m, position, "join", 1))
        .collect();
    Ok(Value::string(strings?.join(&sep)))
}

fn fn_replace(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "replace", 1)?;
    let limit = match arg(args, 3) {
        Value::Undefined => None,
        n => {
            let n = as_number(&n, position)?;
            if n < 0.0 {
                return Err(Box::new(Error::D3012ReplaceLimitNegative(position)));
            }
            Some(n as usize)
        }
    };

    let pattern = arg(args, 1);
    let replacement = arg(args, 2);

    let regex = match &pattern {
        Value::Regex(r) => r.compiled.clone(),
        other => {
            let literal = as_string(other, position, "replace", 2)?;
            regex::Regex::new(&regex::escape(&literal)).unwrap()
        }
    };

    let mut out = String::new();
    let mut last = 0;
    let mut count = 0;
    for caps in regex.captures_iter(&s) {
        if let Some(limit) = limit {
            if count >= limit {
                break;
            }
        }
        let whole = caps.get(0).unwrap();
        out.push_str(&s[last..whole.start()]);
        let replaced = match &replacement {
            Value::String(template) => {
                let mut expanded = String::new();
                caps.expand(template, &mut expanded);
                expanded
            }
            func if func.is_function() => {
                let match_obj = captures_to_object(&caps, whole.start());
                let result = super::call_value(ev, func, vec![match_obj], position)?;
                result
                    .as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| Box::new(Error::D3013ReplaceReturnsEmpty(position)))?
            }
            _ => return Err(Box::new(Error::T0410ArgumentNotValid(position, 3, "replace".into()))),
        };
        if replaced.is_empty() && whole.start() == whole.end() {
            return Err(Box::new(Error::D3013ReplaceReturnsEmpty(position)));
        }
        out.push_str(&replaced);
        last = whole.end();
        count += 1;
    }
    out.push_str(&s[last..]);
    Ok(Value::string(out))
}

fn fn_match(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "match", 1)?;
    let regex = match arg(args, 1) {
        Value::Regex(r) => r.compiled.clone(),
        _ => return Err(Box::new(Error::T0410ArgumentNotValid(position, 2, "match".into()))),
    };
    let limit = match arg(args, 2) {
        Value::Undefined => None,
        n => Some(as_number(&n, position)? as usize),
    };
    let mut results = vec![];
    for (i, caps) in regex.captures_iter(&s).enumerate() {
        if let Some(limit) = limit {
            if i >= limit {
                break;
            }
        }
        let whole = caps.get(0).unwrap();
        results.push(captures_to_object(&caps, whole.start()));
    }
    Ok(Value::array(results, ArrayFlags::SEQUENCE))
}

fn captures_to_object(caps: &regex::Captures, offset: usize) -> Value {
    let whole = caps.get(0).unwrap();
    let mut entries = Object::new();
    entries.insert("match".into(), Value::string(whole.as_str()));
    entries.insert("index".into(), Value::Number(offset as f64));
    let groups: Vec<Value> = (1..caps.len())
        .map(|i| caps.get(i).map(|m| Value::string(m.as_str())).unwrap_or(Value::Undefined))
        .collect();
    entries.insert("groups".into(), Value::array(groups, ArrayFlags::empty()));
    Value::object(entries)
}

fn fn_base64_encode(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    use base64::Engine;
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "base64encode", 1)?;
    Ok(Value::string(base64::engine::general_purpose::STANDARD.encode(s.as_bytes())))
}

fn fn_base64_decode(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    use base64::Engine;
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "base64decode", 1)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(s.as_bytes())
        .map_err(|_| Box::new(Error::T0410ArgumentNotValid(position, 1, "base64decode".into())))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|_| Box::new(Error::T0410ArgumentNotValid(position, 1, "base64decode".into())))?;
    Ok(Value::string(decoded))
}

// -- arrays -------------------------------------------------------------------

fn fn_count(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    Ok(Value::Number(arg(args, 0).members().len() as f64))
}

fn fn_append(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let a = arg(args, 0);
    let b = arg(args, 1);
    if a.is_undefined() {
        return Ok(b);
    }
    if b.is_undefined() {
        return Ok(a);
    }
    let mut items = a.members();
    items.extend(b.members());
    Ok(Value::array(items, ArrayFlags::SEQUENCE))
}

fn fn_sort(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let items = v.members();
    let comparator = arg(args, 1);

    let sorted = if comparator.is_undefined() {
        if !items
            .iter()
            .all(|i| matches!(i, Value::Number(_)) || matches!(i, Value::String(_)))
        {
            return Err(Box::new(Error::D3070InvalidDefaultSort(position)));
        }
        super::sort::stable_sort_by(items, |a, b| {
            value::compare(a, b).ok_or_else(|| Box::new(Error::D3070InvalidDefaultSort(position)))
        })?
    } else {
        super::sort::stable_sort_by(items, |a, b| {
            let result = call_with_arity(ev, &comparator, vec![a.clone(), b.clone()], position)?;
            Ok(if value::is_truthy(&result) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Less
            })
        })?
    };
    Ok(Value::sequence_from(sorted, v.flags().contains(ArrayFlags::SINGLETON)))
}

fn fn_reverse(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let mut items = v.members();
    items.reverse();
    Ok(Value::array(items, ArrayFlags::SEQUENCE))
}

fn fn_distinct(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let mut out: Vec<Value> = vec![];
    for item in v.members() {
        if !out.iter().any(|o| value::deep_equal(o, &item)) {
            out.push(item);
        }
    }
    Ok(Value::array(out, ArrayFlags::SEQUENCE))
}

fn fn_zip(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let lists: Vec<Vec<Value>> = args.iter().map(|a| a.members()).collect();
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let tuple: Vec<Value> = lists.iter().map(|l| l[i].clone()).collect();
        out.push(Value::array(tuple, ArrayFlags::CONS_ARRAY));
    }
    Ok(Value::array(out, ArrayFlags::SEQUENCE))
}

fn fn_shuffle(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    use rand::seq::SliceRandom;
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let mut items = v.members();
    items.shuffle(&mut rand::thread_rng());
    Ok(Value::array(items, ArrayFlags::SEQUENCE))
}

// -- objects ------------------------------------------------------------------

fn lookup_field(item: &Value, key: &str) -> Value {
    match item {
        Value::Object(o) => o
            .entries
            .borrow()
            .get(key)
            .cloned()
            .map(Value::as_path_member)
            .unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

fn fn_keys(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let mut seen = vec![];
    for item in v.members() {
        if let Value::Object(o) = &item {
            for k in o.entries.borrow().keys() {
                if !seen.contains(k) {
                    seen.push(k.clone());
                }
            }
        }
    }
    Ok(Value::array(seen.into_iter().map(Value::string).collect(), ArrayFlags::SEQUENCE))
}

fn fn_lookup(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    let key = arg(args, 1);
    let key = match key.as_str() {
        Some(k) => k,
        None => return Ok(Value::Undefined),
    };
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let mut out = vec![];
    for item in v.members() {
        Value::push_flatten(&mut out, lookup_field(&item, key));
    }
    Ok(Value::sequence_from(out, false))
}

fn fn_merge(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let mut entries = Object::new();
    for item in v.members() {
        match item {
            Value::Object(o) => {
                for (k, val) in o.entries.borrow().iter() {
                    entries.insert(k.clone(), val.clone());
                }
            }
            _ => return Err(Box::new(Error::T0412ArgumentMustBeArrayOfType(position, 1, "merge".into(), "object".into()))),
        }
    }
    Ok(Value::object(entries))
}

fn fn_spread(_ev: &mut Evaluator, _position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let mut out = vec![];
    for item in v.members() {
        if let Value::Object(o) = &item {
            for (k, val) in o.entries.borrow().iter() {
                let mut single = Object::new();
                single.insert(k.clone(), val.clone());
                out.push(Value::object(single));
            }
        } else {
            out.push(item);
        }
    }
    Ok(Value::sequence_from(out, false))
}

fn fn_each(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    let func = arg(args, 1);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let obj = match &v {
        Value::Object(o) => o.entries.borrow().clone(),
        _ => return Ok(Value::Undefined),
    };
    let mut out = vec![];
    for (k, val) in obj.iter() {
        let result = call_with_arity(ev, &func, vec![val.clone(), Value::string(k.as_str())], position)?;
        Value::push_flatten(&mut out, result);
    }
    Ok(Value::sequence_from(out, false))
}

fn fn_sift(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    let func = arg(args, 1);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let obj = match &v {
        Value::Object(o) => o.entries.borrow().clone(),
        _ => return Ok(Value::Undefined),
    };
    let mut entries = Object::new();
    for (k, val) in obj.iter() {
        let keep = call_with_arity(ev, &func, vec![val.clone(), Value::string(k.as_str())], position)?;
        if value::is_truthy(&keep) {
            entries.insert(k.clone(), val.clone());
        }
    }
    if entries.is_empty() {
        Ok(Value::Undefined)
    } else {
        Ok(Value::object(entries))
    }
}

// -- higher-order ---------------------------------------------------------

fn fn_map(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    let func = arg(args, 1);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let items = v.members();
    let whole = Value::array(items.clone(), ArrayFlags::empty());
    let mut out = vec![];
    for (i, item) in items.iter().enumerate() {
        let result = call_with_arity(
            ev,
            &func,
            vec![item.clone(), Value::Number(i as f64), whole.clone()],
            position,
        )?;
        Value::push_flatten(&mut out, result);
    }
    Ok(Value::sequence_from(out, false))
}

fn fn_filter(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    let func = arg(args, 1);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let items = v.members();
    let whole = Value::array(items.clone(), ArrayFlags::empty());
    let mut out = vec![];
    for (i, item) in items.iter().enumerate() {
        let keep = call_with_arity(
            ev,
            &func,
            vec![item.clone(), Value::Number(i as f64), whole.clone()],
            position,
        )?;
        if value::is_truthy(&keep) {
            out.push(item.clone());
        }
    }
    Ok(Value::sequence_from(out, false))
}

fn fn_reduce(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    let func = arg(args, 1);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    if declared_arity_at_least_two(&func).is_none() {
        return Err(Box::new(Error::D3050ReduceFunctionArity(position)));
    }
    let items = v.members();
    let init = arg(args, 2);
    let mut iter = items.into_iter();
    let mut acc = if init.is_undefined() {
        match iter.next() {
            Some(first) => first,
            None => return Ok(Value::Undefined),
        }
    } else {
        init
    };
    for (i, item) in iter.enumerate() {
        acc = call_with_arity(ev, &func, vec![acc, item, Value::Number(i as f64)], position)?;
    }
    Ok(acc)
}

fn declared_arity_at_least_two(func: &Value) -> Option<()> {
    match func {
        Value::Lambda(l) if l.params.len() >= 2 => Some(()),
        Value::NativeFn(n) if n.arity.map_or(true, |a| a >= 2) => Some(()),
        Value::Partial(_) => Some(()),
        _ => None,
    }
}

fn fn_single(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let items = v.members();
    let func = arg(args, 1);
    let mut matched: Vec<Value> = vec![];
    for (i, item) in items.iter().enumerate() {
        let keep = if func.is_undefined() {
            true
        } else {
            let whole = Value::array(items.clone(), ArrayFlags::empty());
            value::is_truthy(&call_with_arity(
                ev,
                &func,
                vec![item.clone(), Value::Number(i as f64), whole],
                position,
            )?)
        };
        if keep {
            matched.push(item.clone());
            if matched.len() > 1 {
                return Err(Box::new(Error::D3138SingleMatchedMany(position, matched.len())));
            }
        }
    }
    matched
        .pop()
        .ok_or_else(|| Box::new(Error::D3139SingleMatchedNone(position)))
}

// -- date/time ------------------------------------------------------------

fn fn_now(_ev: &mut Evaluator, _position: Position, _args: Args) -> Result<Value> {
    Ok(Value::string(chrono::Utc::now().to_rfc3339()))
}

fn fn_millis(_ev: &mut Evaluator, _position: Position, _args: Args) -> Result<Value> {
    Ok(Value::Number(chrono::Utc::now().timestamp_millis() as f64))
}

fn fn_from_millis(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let millis = as_number(&v, position)? as i64;
    let dt = chrono::DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Box::new(Error::T0410ArgumentNotValid(position, 1, "fromMillis".into())))?;
    Ok(Value::string(dt.to_rfc3339()))
}

fn fn_to_millis(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let s = as_string(&v, position, "toMillis", 1)?;
    let dt = chrono::DateTime::parse_from_rfc3339(&s)
        .map_err(|_| Box::new(Error::T0410ArgumentNotValid(position, 1, "toMillis".into())))?;
    Ok(Value::Number(dt.timestamp_millis() as f64))
}

// -- misc -------------------------------------------------------------------

fn fn_error(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let message = match arg(args, 0) {
        Value::Undefined => "$error() function evaluated".to_string(),
        v => stringify(&v),
    };
    Err(Box::new(Error::D3137UserError(position, message)))
}

fn fn_assert(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let condition = arg(args, 0);
    if value::is_truthy(&condition) {
        return Ok(Value::Undefined);
    }
    let message = match arg(args, 1) {
        Value::Undefined => "$assert() statement failed".to_string(),
        v => stringify(&v),
    };
    Err(Box::new(Error::D3141AssertionFailed(position, message)))
}

/// `$eval(expr [, context])`: parses `expr` as a fresh JSONata expression
/// and evaluates it against `context` (or `Undefined`) in a new root
/// environment. Unlike a plain function call, this does not see the
/// caller's lexical bindings — it is a second, independent evaluation,
/// matching how the reference implementation treats a string re-parse.
fn fn_eval(ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let expr = arg(args, 0);
    if expr.is_undefined() {
        return Ok(Value::Undefined);
    }
    let expr = as_string(&expr, position, "eval", 1)?;
    let context = arg(args, 1);
    let ast = crate::parser::parse(&expr)
        .map_err(|e| Box::new(Error::D3120EvalExpressionInvalid(position, e.to_string())))?;
    let env = Evaluator::root_environment(&context, &[]);
    ev.evaluate(&ast, &context, &env)
}

/// `$formatBase(number [, radix])`: renders the integer part of `number`
/// in the given radix (2-36, default 10), lowercase, with a leading `-`
/// for negative values.
fn fn_format_base(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let n = as_number(&v, position)?;
    let radix = match arg(args, 1) {
        Value::Undefined => 10,
        r => as_number(&r, position)? as u32,
    };
    if !(2..=36).contains(&radix) {
        return Err(Box::new(Error::D3081RadixOutOfRange(position)));
    }
    let negative = n < 0.0;
    let mut magnitude = n.abs().trunc() as u64;
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut digits = Vec::new();
    if magnitude == 0 {
        digits.push(b'0');
    }
    while magnitude > 0 {
        digits.push(DIGITS[(magnitude % radix as u64) as usize]);
        magnitude /= radix as u64;
    }
    digits.reverse();
    let mut s = String::from_utf8(digits).expect("radix digits are ASCII");
    if negative {
        s.insert(0, '-');
    }
    Ok(Value::string(s))
}

struct NumberPicture {
    min_integer_digits: usize,
    min_fraction_digits: usize,
    max_fraction_digits: usize,
    grouping: bool,
    prefix: String,
    suffix: String,
}

/// Parses the (non-negative) subpicture of a `$formatNumber` picture string
/// into digit-count and literal-text components. Only the common decimal
/// subset (`#`/`0` digit placeholders, `,` grouping, `.` decimal point,
/// `%`/permille suffixes) is supported.
fn parse_number_picture(picture: &str, decimal_sep: char, grouping_sep: char) -> NumberPicture {
    let mut prefix = String::new();
    let mut suffix = String::new();
    let mut integer_part = String::new();
    let mut fraction_part = String::new();
    let mut seen_digit = false;
    let mut past_decimal = false;
    for c in picture.chars() {
        if c == decimal_sep && !past_decimal {
            past_decimal = true;
            continue;
        }
        if c == '0' || c == '#' || c == grouping_sep {
            seen_digit = true;
            if past_decimal {
                fraction_part.push(c);
            } else {
                integer_part.push(c);
            }
        } else if !seen_digit {
            prefix.push(c);
        } else {
            suffix.push(c);
        }
    }
    let min_integer_digits = integer_part.chars().filter(|&c| c == '0').count().max(1);
    let min_fraction_digits = fraction_part.chars().filter(|&c| c == '0').count();
    let max_fraction_digits = fraction_part.chars().filter(|&c| c == '0' || c == '#').count();
    let grouping = integer_part.contains(grouping_sep) || fraction_part.contains(grouping_sep);
    NumberPicture {
        min_integer_digits,
        min_fraction_digits,
        max_fraction_digits: max_fraction_digits.max(min_fraction_digits),
        grouping,
        prefix,
        suffix,
    }
}

fn group_integer_digits(digits: &str, grouping_sep: char) -> String {
    let bytes: Vec<char> = digits.chars().collect();
    let mut out = String::new();
    for (i, c) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(grouping_sep);
        }
        out.push(*c);
    }
    out
}

/// `$formatNumber(number, picture [, options])`: renders `number` as a
/// decimal string per an XPath-style picture (`#`/`0` placeholders, `,`
/// grouping, `.` decimal point, `%`/permille scaling, `;` to separate a
/// distinct negative-number subpicture). `options` may override the
/// decimal/grouping separator characters.
fn fn_format_number(_ev: &mut Evaluator, position: Position, args: Args) -> Result<Value> {
    let v = arg(args, 0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let mut n = as_number(&v, position)?;
    let picture = as_string(&arg(args, 1), position, "formatNumber", 2)?;

    let mut decimal_sep = '.';
    let mut grouping_sep = ',';
    let mut minus_sign = '-';
    let mut percent = '%';
    let options = arg(args, 2);
    if !options.is_undefined() && !matches!(options, Value::Object(_)) {
        return Err(Box::new(Error::D3135InvalidFormatNumberOptions(position)));
    }
    if let Value::Object(o) = options {
        let entries = o.entries.borrow();
        let char_opt = |key: &str| -> Option<char> {
            entries.get(key).and_then(Value::as_str).and_then(|s| s.chars().next())
        };
        if let Some(c) = char_opt("decimal-separator") {
            decimal_sep = c;
        }
        if let Some(c) = char_opt("grouping-separator") {
            grouping_sep = c;
        }
        if let Some(c) = char_opt("minus-sign") {
            minus_sign = c;
        }
        if let Some(c) = char_opt("percent") {
            percent = c;
        }
    }

    let mut subpictures = picture.splitn(2, ';');
    let positive_picture = subpictures.next().unwrap_or("");
    let negative_picture = subpictures.next();

    let is_percent = positive_picture.contains(percent);
    if is_percent {
        n *= 100.0;
    }

    let negative = n.is_sign_negative() && n != 0.0;
    let (active_picture, explicit_negative) = match (negative, negative_picture) {
        (true, Some(neg)) => (neg, true),
        _ => (positive_picture, false),
    };
    let parsed = parse_number_picture(active_picture, decimal_sep, grouping_sep);

    let rounded = round_half_even(n.abs(), parsed.max_fraction_digits as i32);
    let scaled = (rounded * 10f64.powi(parsed.max_fraction_digits as i32)).round() as i64;
    let divisor = 10i64.pow(parsed.max_fraction_digits as u32);
    let integer_digits = (scaled / divisor).to_string();
    let mut fraction_digits = (scaled % divisor).abs().to_string();
    while fraction_digits.len() < parsed.max_fraction_digits {
        fraction_digits.insert(0, '0');
    }
    while fraction_digits.len() > parsed.min_fraction_digits && fraction_digits.ends_with('0') {
        fraction_digits.pop();
    }

    let mut integer_digits = integer_digits;
    while integer_digits.len() < parsed.min_integer_digits {
        integer_digits.insert(0, '0');
    }
    let integer_str = if parsed.grouping {
        group_integer_digits(&integer_digits, grouping_sep)
    } else {
        integer_digits
    };

    let mut result = String::new();
    result.push_str(&parsed.prefix);
    if negative && !explicit_negative {
        result.push(minus_sign);
    }
    result.push_str(&integer_str);
    if parsed.max_fraction_digits > 0 && !fraction_digits.is_empty() {
        result.push(decimal_sep);
        result.push_str(&fraction_digits);
    }
    result.push_str(&parsed.suffix);
    Ok(Value::string(result))
}
