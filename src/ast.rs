//! The abstract syntax tree produced by the parser, before and after the
//! postprocessing pass that folds path steps, predicates, grouping and
//! sorting onto a single [`NodeKind::Path`].

use std::fmt;

use crate::position::Position;

pub type ObjectLiteral = Vec<(Node, Node)>;

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    Minus(Box<Node>),
    ArrayConstructor(Vec<Node>),
    ObjectConstructor(ObjectLiteral),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    Concat,
    And,
    Or,
    In,
    PathOp,
    Predicate,
    Range,
    ContextBind,
    PositionalBind,
    Apply,
    Bind,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Modulus => "%",
            Equal => "=",
            NotEqual => "!=",
            LessThan => "<",
            GreaterThan => ">",
            LessThanEqual => "<=",
            GreaterThanEqual => ">=",
            Concat => "&",
            And => "and",
            Or => "or",
            In => "in",
            PathOp => ".",
            Predicate => "[]",
            Range => "..",
            ContextBind => "@",
            PositionalBind => "#",
            Apply => "~>",
            Bind => ":=",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// A bare or backtick-quoted property name used as a path step.
    Name(String),
    /// `$name`, `$` (context) or `$$` (root), stored without the sigil
    /// (empty string for context, `"$"` for root).
    Var(String),
    Wildcard,
    DescendantWildcard,
    Parent,
    Regex(String, String),
    Block(Vec<Node>),
    Unary(UnaryOp),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Ternary {
        cond: Box<Node>,
        truthy: Box<Node>,
        falsy: Option<Box<Node>>,
    },
    /// A fully postprocessed path: each entry is a step, carrying its own
    /// predicates/group-by/sort/keep-array annotations on the `Node` itself.
    Path(Vec<Node>),
    GroupBy(Box<Node>, ObjectLiteral),
    OrderBy(Box<Node>, Vec<(Node, bool)>),
    Lambda {
        params: Vec<String>,
        body: Box<Node>,
    },
    Function {
        proc: Box<Node>,
        args: Vec<Node>,
        is_partial: bool,
    },
    PartialArg,
    Transform {
        pattern: Box<Node>,
        update: Box<Node>,
        delete: Option<Box<Node>>,
    },
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Null => write!(f, "null"),
            NodeKind::Bool(b) => write!(f, "{}", b),
            NodeKind::Number(n) => write!(f, "{}", n),
            NodeKind::Str(s) => write!(f, "\"{}\"", s),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Position,
    /// Set by a trailing `[]` on a path step: force the step's result to
    /// remain an array even if it would otherwise unwrap to a singleton.
    pub keep_array: bool,
    /// Set when an array constructor is the first or last step of a path,
    /// where it must not be flattened into the surrounding sequence.
    pub cons_array: bool,
    /// Predicates/index filters attached to this step (`step[pred]`).
    pub predicates: Vec<Node>,
    /// Context variable bound with `@$v`.
    pub focus: Option<String>,
    /// Positional index variable bound with `#$i`.
    pub index: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self {
            kind,
            position,
            keep_array: false,
            cons_array: false,
            predicates: Vec::new(),
            focus: None,
            index: None,
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self.kind, NodeKind::Path(_))
    }

    /// Steps of a `Path` node, empty otherwise.
    pub fn path_steps(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Path(steps) => steps,
            _ => &[],
        }
    }
}
