//! Folds the raw parse tree into its final shape: bare names become
//! single-step paths, `.`-chained expressions merge into one [`NodeKind::Path`]
//! with predicates/sort/group-by attached to the relevant step, and literal
//! values are rejected as path steps.

use crate::ast::{BinaryOp, Node, NodeKind, UnaryOp};
use crate::error::{Error, Result};

pub fn process(node: Node) -> Result<Node> {
    let mut result = match node.kind.clone() {
        NodeKind::Name(_) => {
            let position = node.position;
            Node::new(NodeKind::Path(vec![node]), position)
        }
        NodeKind::Unary(op) => process_unary(node, op)?,
        NodeKind::Binary(op, lhs, rhs) => process_binary(node.position, op, *lhs, *rhs)?,
        NodeKind::Block(children) => {
            let children = children.into_iter().map(process).collect::<Result<_>>()?;
            Node::new(NodeKind::Block(children), node.position)
        }
        NodeKind::Ternary { cond, truthy, falsy } => Node::new(
            NodeKind::Ternary {
                cond: Box::new(process(*cond)?),
                truthy: Box::new(process(*truthy)?),
                falsy: falsy.map(|f| process(*f)).transpose()?.map(Box::new),
            },
            node.position,
        ),
        NodeKind::GroupBy(lhs, pairs) => process_group_by(node.position, *lhs, pairs)?,
        NodeKind::OrderBy(lhs, terms) => process_order_by(node.position, *lhs, terms)?,
        NodeKind::Lambda { params, body } => Node::new(
            NodeKind::Lambda {
                params,
                body: Box::new(process(*body)?),
            },
            node.position,
        ),
        NodeKind::Function {
            proc,
            args,
            is_partial,
        } => Node::new(
            NodeKind::Function {
                proc: Box::new(process(*proc)?),
                args: args.into_iter().map(process).collect::<Result<_>>()?,
                is_partial,
            },
            node.position,
        ),
        NodeKind::Transform {
            pattern,
            update,
            delete,
        } => Node::new(
            NodeKind::Transform {
                pattern: Box::new(process(*pattern)?),
                update: Box::new(process(*update)?),
                delete: delete.map(|d| process(*d)).transpose()?.map(Box::new),
            },
            node.position,
        ),
        _ => node.clone(),
    };

    if node.keep_array {
        result.keep_array = true;
    }

    Ok(result)
}

fn process_unary(node: Node, op: UnaryOp) -> Result<Node> {
    let kind = match op {
        UnaryOp::Minus(operand) => {
            let operand = process(*operand)?;
            if let NodeKind::Number(n) = operand.kind {
                return Ok(Node::new(NodeKind::Number(-n), node.position));
            }
            UnaryOp::Minus(Box::new(operand))
        }
        UnaryOp::ArrayConstructor(items) => {
            UnaryOp::ArrayConstructor(items.into_iter().map(process).collect::<Result<_>>()?)
        }
        UnaryOp::ObjectConstructor(pairs) => UnaryOp::ObjectConstructor(process_pairs(pairs)?),
    };
    Ok(Node::new(NodeKind::Unary(kind), node.position))
}

fn process_pairs(pairs: Vec<(Node, Node)>) -> Result<Vec<(Node, Node)>> {
    pairs
        .into_iter()
        .map(|(k, v)| Ok((process(k)?, process(v)?)))
        .collect()
}

fn process_binary(position: crate::position::Position, op: BinaryOp, lhs: Node, rhs: Node) -> Result<Node> {
    match op {
        BinaryOp::PathOp => process_path(position, lhs, rhs),
        BinaryOp::Predicate => process_predicate(lhs, rhs),
        BinaryOp::ContextBind => process_context_bind(lhs, rhs),
        BinaryOp::PositionalBind => process_positional_bind(lhs, rhs),
        _ => Ok(Node::new(
            NodeKind::Binary(op, Box::new(process(lhs)?), Box::new(process(rhs)?)),
            position,
        )),
    }
}

/// Merges a `.`-chained pair of expressions into one `Path`, appending the
/// right-hand side as a new step (or splicing its own steps in, if it is
/// itself already a path).
fn process_path(position: crate::position::Position, lhs: Node, rhs: Node) -> Result<Node> {
    let lhs = process(lhs)?;
    let rhs = process(rhs)?;

    let mut result = if lhs.is_path() {
        lhs
    } else {
        Node::new(NodeKind::Path(vec![lhs]), position)
    };

    let mut steps = match result.kind {
        NodeKind::Path(steps) => steps,
        _ => unreachable!(),
    };

    if rhs.is_path() {
        if let NodeKind::Path(mut rhs_steps) = rhs.kind {
            steps.append(&mut rhs_steps);
        }
    } else {
        steps.push(rhs);
    }

    let last_index = steps.len() - 1;
    let mut keep_array = false;
    for (i, step) in steps.iter_mut().enumerate() {
        match &step.kind {
            NodeKind::Number(_) | NodeKind::Bool(_) | NodeKind::Null => {
                return Err(Box::new(Error::S0213InvalidStep(
                    step.position,
                    step.kind.to_string(),
                )))
            }
            NodeKind::Str(s) => {
                let s = s.clone();
                step.kind = NodeKind::Name(s);
            }
            NodeKind::Unary(UnaryOp::ArrayConstructor(_)) => {
                if i == 0 || i == last_index {
                    step.cons_array = true;
                }
            }
            _ => {}
        }
        keep_array = keep_array || step.keep_array;
    }

    result.kind = NodeKind::Path(steps);
    result.keep_array = keep_array;
    Ok(result)
}

/// Attaches a `[predicate]` to the last step of a path (or wraps a
/// non-path expression into a single-step path first).
fn process_predicate(lhs: Node, rhs: Node) -> Result<Node> {
    let mut result = process(lhs)?;
    let predicate = process(rhs)?;

    let is_path = result.is_path();
    let step = if is_path {
        match &mut result.kind {
            NodeKind::Path(steps) => steps.last_mut().unwrap(),
            _ => unreachable!(),
        }
    } else {
        &mut result
    };

    step.predicates.push(predicate);
    Ok(result)
}

fn process_context_bind(lhs: Node, rhs: Node) -> Result<Node> {
    let mut result = process(lhs)?;
    let name = match rhs.kind {
        NodeKind::Var(name) => name,
        _ => return Err(Box::new(Error::S0216ContextBindNotVariable(rhs.position))),
    };

    let is_path = result.is_path();
    let step = if is_path {
        match &mut result.kind {
            NodeKind::Path(steps) => steps.last_mut().unwrap(),
            _ => unreachable!(),
        }
    } else {
        &mut result
    };
    step.focus = Some(name);
    Ok(result)
}

fn process_positional_bind(lhs: Node, rhs: Node) -> Result<Node> {
    let mut result = process(lhs)?;
    let name = match rhs.kind {
        NodeKind::Var(name) => name,
        _ => return Err(Box::new(Error::S0214ExpectedVarRight(rhs.position, "#".into()))),
    };

    let is_path = result.is_path();
    let step = if is_path {
        match &mut result.kind {
            NodeKind::Path(steps) => steps.last_mut().unwrap(),
            _ => unreachable!(),
        }
    } else {
        &mut result
    };
    step.index = Some(name);
    Ok(result)
}

fn process_group_by(
    position: crate::position::Position,
    lhs: Node,
    pairs: Vec<(Node, Node)>,
) -> Result<Node> {
    let result = process(lhs)?;
    let pairs = process_pairs(pairs)?;
    Ok(Node::new(NodeKind::GroupBy(Box::new(result), pairs), position))
}

fn process_order_by(
    position: crate::position::Position,
    lhs: Node,
    terms: Vec<(Node, bool)>,
) -> Result<Node> {
    let result = process(lhs)?;
    let terms = terms
        .into_iter()
        .map(|(expr, desc)| Ok((process(expr)?, desc)))
        .collect::<Result<_>>()?;
    Ok(Node::new(NodeKind::OrderBy(Box::new(result), terms), position))
}
