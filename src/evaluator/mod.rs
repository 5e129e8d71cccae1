//! The tree-walking evaluator. [`Evaluator::evaluate`] recurses over the
//! postprocessed AST, threading a `context` value (the current `.` item)
//! alongside the lexical [`Environment`] rather than storing it as a binding,
//! since the context changes on every path step while the environment only
//! grows new scopes at blocks, lambdas and predicates.

mod call;
mod functions;
mod path;
mod sort;

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{BinaryOp, Node, NodeKind, UnaryOp};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::options::{Budget, CancellationToken, Options};
use crate::position::Position;
use crate::value::{self, ArrayFlags, LambdaValue, Object, Value};

pub use call::{call_value, call_with_arity};

pub struct Evaluator {
    budget: Budget,
    depth: usize,
}

impl Evaluator {
    pub fn new(options: &Options, cancellation: CancellationToken) -> Self {
        Self {
            budget: Budget::new(options, cancellation),
            depth: 0,
        }
    }

    /// Builds the root environment: builtins plus the input document bound
    /// under `$` (root reference) and any caller-supplied bindings.
    pub fn root_environment(input: &Value, bindings: &[(String, Value)]) -> Environment {
        let env = Environment::root();
        functions::register_builtins(&env);
        env.bind("$", input.clone());
        for (name, value) in bindings {
            env.bind(name.as_str(), value.clone());
        }
        env
    }

    pub fn evaluate(&mut self, node: &Node, context: &Value, env: &Environment) -> Result<Value> {
        self.budget.check(node.position)?;

        match &node.kind {
            NodeKind::Null => Ok(Value::Null),
            NodeKind::Bool(b) => Ok(Value::Bool(*b)),
            NodeKind::Number(n) => Ok(Value::Number(*n)),
            NodeKind::Str(s) => Ok(Value::string(s.as_str())),
            NodeKind::Var(name) => self.eval_var(name, node.position, context, env),
            NodeKind::Regex(pattern, flags) => call::eval_regex_literal(pattern, flags, node.position),

            // Bare occurrences only reach here defensively: a standalone `*`,
            // `**`, `%` or field name is its own one-step path.
            NodeKind::Name(_) | NodeKind::Wildcard | NodeKind::DescendantWildcard | NodeKind::Parent => {
                self.path_eval(std::slice::from_ref(node), context, env)
            }
            NodeKind::Path(steps) => self.path_eval(steps, context, env),

            NodeKind::Block(children) => self.eval_block(children, context, env),
            NodeKind::Unary(op) => self.eval_unary(op, node.position, context, env),

            NodeKind::Binary(BinaryOp::Apply, lhs, rhs) => call::eval_apply(self, lhs, rhs, context, env),
            NodeKind::Binary(BinaryOp::Bind, lhs, rhs) => self.eval_bind(lhs, rhs, context, env),
            NodeKind::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs, node.position, context, env),

            NodeKind::Ternary { cond, truthy, falsy } => {
                let c = self.evaluate(cond, context, env)?;
                if value::is_truthy(&c) {
                    self.evaluate(truthy, context, env)
                } else if let Some(falsy) = falsy {
                    self.evaluate(falsy, context, env)
                } else {
                    Ok(Value::Undefined)
                }
            }

            NodeKind::GroupBy(inner, pairs) => path::eval_group_by(self, inner, pairs, context, env),
            NodeKind::OrderBy(inner, terms) => path::eval_order_by(self, inner, terms, context, env, node.position),

            NodeKind::Lambda { params, body } => Ok(Value::Lambda(Rc::new(LambdaValue {
                params: params.clone(),
                body: Rc::new((**body).clone()),
                environment: env.clone(),
                name: RefCell::new(None),
            }))),

            NodeKind::Function { proc, args, is_partial } => {
                call::eval_function_call(self, proc, args, *is_partial, node.position, context, env)
            }
            NodeKind::PartialArg => Ok(Value::Undefined),

            NodeKind::Transform { .. } => Err(Box::new(Error::D3137UserError(
                node.position,
                "the transform operator |...|...|...| is not supported".into(),
            ))),
        }
    }

    /// `$name`: looks up a bound variable. An empty name (bare `$`) is the
    /// context value, always available. Any other name that is bound
    /// nowhere in the lexical chain is a `ReferenceError`, not `Undefined`
    /// — unlike a missing path field, referencing a variable that was
    /// never declared is a programming mistake the evaluator surfaces.
    fn eval_var(&self, name: &str, position: Position, context: &Value, env: &Environment) -> Result<Value> {
        if name.is_empty() {
            return Ok(context.clone());
        }
        env.try_lookup(name)
            .ok_or_else(|| Box::new(Error::D3011UnknownVariable(position, name.to_string())))
    }

    fn eval_block(&mut self, children: &[Node], context: &Value, env: &Environment) -> Result<Value> {
        let block_env = env.child();
        let mut result = Value::Undefined;
        for child in children {
            result = self.evaluate(child, context, &block_env)?;
        }
        Ok(result)
    }

    fn eval_bind(&mut self, lhs: &Node, rhs: &Node, context: &Value, env: &Environment) -> Result<Value> {
        let name = match &lhs.kind {
            NodeKind::Var(name) => name.clone(),
            _ => return Err(Box::new(Error::S0212InvalidAssignmentTarget(lhs.position))),
        };
        let value = self.evaluate(rhs, context, env)?;
        if let Value::Lambda(lambda) = &value {
            if lambda.name.borrow().is_none() {
                *lambda.name.borrow_mut() = Some(name.clone());
            }
        }
        env.bind(name, value.clone());
        Ok(value)
    }

    fn eval_unary(&mut self, op: &UnaryOp, position: Position, context: &Value, env: &Environment) -> Result<Value> {
        match op {
            UnaryOp::Minus(operand) => {
                let v = self.evaluate(operand, context, env)?;
                match v {
                    Value::Undefined => Ok(Value::Undefined),
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(Box::new(Error::D1002NegatingNonNumeric(
                        position,
                        format!("{:?}", other),
                    ))),
                }
            }
            UnaryOp::ArrayConstructor(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item, context, env)?);
                }
                Ok(Value::array(values, ArrayFlags::CONS_ARRAY))
            }
            UnaryOp::ObjectConstructor(pairs) => self.eval_object_constructor(pairs, context, env),
        }
    }

    fn eval_object_constructor(
        &mut self,
        pairs: &[(Node, Node)],
        context: &Value,
        env: &Environment,
    ) -> Result<Value> {
        let mut entries = Object::new();
        // A bare `{k:v}` with no preceding path applies to every item of the
        // context sequence, merging results into one object (grouping with
        // an implicit identity key expression already handled by
        // `NodeKind::GroupBy`; this covers the plain object-literal case).
        let items = if context.is_sequence() || matches!(context, Value::Undefined) {
            context.members()
        } else {
            vec![context.clone()]
        };
        let items = if items.is_empty() { vec![Value::Undefined] } else { items };

        for item in &items {
            for (key_node, value_node) in pairs {
                let key_val = self.evaluate(key_node, item, env)?;
                if key_val.is_undefined() {
                    continue;
                }
                let key = key_val
                    .as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| Error::T1003NonStringKey(key_node.position, format!("{:?}", key_val)))?;
                let value = self.evaluate(value_node, item, env)?;
                entries.insert(key, value);
            }
        }
        Ok(Value::object(entries))
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Node,
        rhs: &Node,
        position: Position,
        context: &Value,
        env: &Environment,
    ) -> Result<Value> {
        use BinaryOp::*;
        match op {
            And => {
                let l = self.evaluate(lhs, context, env)?;
                if !value::is_truthy(&l) {
                    return Ok(Value::Bool(false));
                }
                let r = self.evaluate(rhs, context, env)?;
                Ok(Value::Bool(value::is_truthy(&r)))
            }
            Or => {
                let l = self.evaluate(lhs, context, env)?;
                if value::is_truthy(&l) {
                    return Ok(Value::Bool(true));
                }
                let r = self.evaluate(rhs, context, env)?;
                Ok(Value::Bool(value::is_truthy(&r)))
            }
            Concat => {
                let l = self.evaluate(lhs, context, env)?;
                let r = self.evaluate(rhs, context, env)?;
                let mut s = String::new();
                s.push_str(&functions::stringify(&l));
                s.push_str(&functions::stringify(&r));
                Ok(Value::string(s))
            }
            In => {
                let l = self.evaluate(lhs, context, env)?;
                let r = self.evaluate(rhs, context, env)?;
                if l.is_undefined() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(r.members().iter().any(|m| value::deep_equal(&l, m))))
            }
            Range => {
                let l = self.evaluate(lhs, context, env)?;
                let r = self.evaluate(rhs, context, env)?;
                if l.is_undefined() || r.is_undefined() {
                    return Ok(Value::Undefined);
                }
                let lo = l
                    .as_f64()
                    .filter(|n| n.fract() == 0.0)
                    .ok_or_else(|| Error::T2003LeftSideRangeNotInteger(position))?;
                let hi = r
                    .as_f64()
                    .filter(|n| n.fract() == 0.0)
                    .ok_or_else(|| Error::T2004RightSideRangeNotInteger(position))?;
                if lo > hi {
                    return Ok(Value::empty_sequence());
                }
                let items = (lo as i64..=hi as i64).map(|n| Value::Number(n as f64)).collect();
                Ok(Value::array(items, ArrayFlags::SEQUENCE))
            }
            Equal | NotEqual => {
                let l = self.evaluate(lhs, context, env)?;
                let r = self.evaluate(rhs, context, env)?;
                if l.is_undefined() || r.is_undefined() {
                    return Ok(Value::Undefined);
                }
                let eq = value::deep_equal(&l, &r);
                Ok(Value::Bool(if op == Equal { eq } else { !eq }))
            }
            LessThan | LessThanEqual | GreaterThan | GreaterThanEqual => {
                let l = self.evaluate(lhs, context, env)?;
                let r = self.evaluate(rhs, context, env)?;
                if l.is_undefined() || r.is_undefined() {
                    return Ok(Value::Undefined);
                }
                let ordering = value::compare(&l, &r)
                    .ok_or_else(|| Error::T2010BinaryOpTypes(position, op.to_string()))?;
                use std::cmp::Ordering::*;
                let result = match (op, ordering) {
                    (LessThan, Less) => true,
                    (LessThanEqual, Less | Equal) => true,
                    (GreaterThan, Greater) => true,
                    (GreaterThanEqual, Greater | Equal) => true,
                    _ => false,
                };
                Ok(Value::Bool(result))
            }
            Add | Subtract | Multiply | Divide | Modulus => {
                let l = self.evaluate(lhs, context, env)?;
                let r = self.evaluate(rhs, context, env)?;
                if l.is_undefined() || r.is_undefined() {
                    return Ok(Value::Undefined);
                }
                let a = l
                    .as_f64()
                    .ok_or_else(|| Error::T2001LeftSideNotNumber(position, op.to_string()))?;
                let b = r
                    .as_f64()
                    .ok_or_else(|| Error::T2002RightSideNotNumber(position, op.to_string()))?;
                let result = match op {
                    Add => a + b,
                    Subtract => a - b,
                    Multiply => a * b,
                    Divide => a / b,
                    Modulus => a % b,
                    _ => unreachable!(),
                };
                if !result.is_finite() {
                    return Err(Box::new(Error::D3001NonFiniteNumber(position)));
                }
                Ok(Value::Number(result))
            }
            PathOp | Predicate | ContextBind | PositionalBind => {
                unreachable!("folded into Path during postprocessing")
            }
            Apply | Bind => unreachable!("handled by dedicated match arms"),
        }
    }

    pub(crate) fn check_depth(&mut self, position: Position) -> Result<()> {
        self.depth += 1;
        self.budget.check_depth(self.depth, position)
    }

    pub(crate) fn leave_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn path_eval(&mut self, steps: &[Node], context: &Value, env: &Environment) -> Result<Value> {
        path::eval_path(self, steps, context, env)
    }
}
