//! Function invocation: the `~>` apply operator, ordinary and partial calls,
//! and `call_value`, the single place that knows how to invoke a `Lambda`,
//! `NativeFn` or `Partial`.

use crate::ast::{Node, NodeKind};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::position::Position;
use crate::value::{PartialValue, RegexValue, Value};

use super::Evaluator;

pub fn eval_regex_literal(pattern: &str, flags: &str, position: Position) -> Result<Value> {
    let mut pattern = pattern.to_string();
    if flags.contains('i') {
        pattern = format!("(?i){}", pattern);
    }
    if flags.contains('m') {
        pattern = format!("(?m){}", pattern);
    }
    let compiled = regex::Regex::new(&pattern)
        .map_err(|e| Error::S0302InvalidRegex(position, e.to_string()))?;
    Ok(Value::Regex(std::rc::Rc::new(RegexValue {
        source: pattern,
        flags: flags.to_string(),
        compiled,
    })))
}

/// `lhs ~> rhs`: evaluates `lhs`, then calls `rhs` (a function call
/// expression, or any callable value) with `lhs` prepended as its first
/// argument.
pub(super) fn eval_apply(ev: &mut Evaluator, lhs: &Node, rhs: &Node, context: &Value, env: &Environment) -> Result<Value> {
    let lhs_val = ev.evaluate(lhs, context, env)?;

    if let NodeKind::Function { proc, args, is_partial: false } = &rhs.kind {
        let callee = ev.evaluate(proc, context, env)?;
        let mut arg_vals = Vec::with_capacity(args.len() + 1);
        arg_vals.push(lhs_val);
        for a in args {
            arg_vals.push(ev.evaluate(a, context, env)?);
        }
        return call_value(ev, &callee, arg_vals, rhs.position);
    }

    let callee = ev.evaluate(rhs, context, env)?;
    call_value(ev, &callee, vec![lhs_val], rhs.position)
}

pub(super) fn eval_function_call(
    ev: &mut Evaluator,
    proc: &Node,
    args: &[Node],
    is_partial: bool,
    position: Position,
    context: &Value,
    env: &Environment,
) -> Result<Value> {
    let callee = ev.evaluate(proc, context, env)?;

    if is_partial {
        let mut bound_args = Vec::with_capacity(args.len());
        for arg in args {
            if matches!(arg.kind, NodeKind::PartialArg) {
                bound_args.push(None);
            } else {
                bound_args.push(Some(ev.evaluate(arg, context, env)?));
            }
        }
        if !callee.is_function() {
            return Err(Box::new(Error::T1006NotAFunction(position)));
        }
        return Ok(Value::Partial(std::rc::Rc::new(PartialValue { callee, bound_args })));
    }

    let mut arg_vals = Vec::with_capacity(args.len());
    for arg in args {
        arg_vals.push(ev.evaluate(arg, context, env)?);
    }
    call_value(ev, &callee, arg_vals, position)
}

/// Invokes any callable `Value`. The body of a `Lambda` is evaluated with
/// its first argument as `$`. Most lambda invocations in JSONata are either
/// plain calls (`$f(5)`, where there is no useful ambient context to thread
/// through) or higher-order callbacks (`$map`/`$filter`/`$each`/...), where
/// binding `$` to the first argument means a callback like
/// `function($v){ $.name }` sees `$` as the very item it was handed — which
/// is what a reader expects without consulting the declared parameter name.
pub fn call_value(ev: &mut Evaluator, callee: &Value, args: Vec<Value>, position: Position) -> Result<Value> {
    match callee {
        Value::Lambda(lambda) => {
            ev.check_depth(position)?;
            let call_env = lambda.environment.child();
            for (i, param) in lambda.params.iter().enumerate() {
                call_env.bind(param.as_str(), args.get(i).cloned().unwrap_or(Value::Undefined));
            }
            let call_context = args.first().cloned().unwrap_or(Value::Undefined);
            let result = ev.evaluate(&lambda.body, &call_context, &call_env);
            ev.leave_depth();
            result
        }
        Value::NativeFn(native) => (native.implementation)(ev, position, &args),
        Value::Partial(partial) => {
            let mut filled = Vec::with_capacity(partial.bound_args.len());
            let mut supplied = args.into_iter();
            for slot in &partial.bound_args {
                match slot {
                    Some(v) => filled.push(v.clone()),
                    None => filled.push(supplied.next().unwrap_or(Value::Undefined)),
                }
            }
            call_value(ev, &partial.callee, filled, position)
        }
        Value::Undefined => Err(Box::new(Error::T1006NotAFunction(position))),
        _ => Err(Box::new(Error::T1006NotAFunction(position))),
    }
}

/// The declared arity of a callable, used by higher-order functions
/// (`$map`/`$filter`/`$each`/`$reduce`) to decide how many of `(value,
/// index, array)` a callback actually wants.
fn declared_arity(callee: &Value) -> Option<usize> {
    match callee {
        Value::Lambda(lambda) => Some(lambda.params.len()),
        Value::NativeFn(native) => native.arity,
        Value::Partial(partial) => Some(partial.bound_args.iter().filter(|a| a.is_none()).count()),
        _ => None,
    }
}

/// Calls `callee` with `args`, truncated to its declared arity so a
/// callback declared with fewer parameters than `args` supplies simply
/// ignores the extras (e.g. `$map($arr, function($v){$v})` never sees the
/// index or whole-array arguments `$map` is prepared to pass).
pub fn call_with_arity(ev: &mut Evaluator, callee: &Value, mut args: Vec<Value>, position: Position) -> Result<Value> {
    if let Some(arity) = declared_arity(callee) {
        if args.len() > arity {
            args.truncate(arity);
        }
    }
    call_value(ev, callee, args, position)
}
