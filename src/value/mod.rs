//! The runtime value model.
//!
//! `Value` is cheap to clone: everything beyond the small scalar variants is
//! `Rc`-shared, mirroring the reference-counted, arena-free design the
//! language's own notes call out as an acceptable alternative to bump
//! allocation. Arrays carry an [`ArrayFlags`] bitset recording whether they
//! are a flattened query *sequence*, whether a singleton should stay an
//! array (`keep_array`/`[]`), and whether they came from an explicit array
//! constructor (`cons_array`) so path evaluation can tell "one value" apart
//! from "an array containing one value".

mod convert;
mod ops;

pub use convert::{from_json, to_json};
pub use ops::{compare, deep_equal, is_truthy, type_name};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Node;
use crate::environment::Environment;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ArrayFlags: u8 {
        /// This array is a flattened query-result sequence, not a literal array.
        const SEQUENCE = 0b0_0001;
        /// A singleton sequence that must *not* collapse to its one element.
        const SINGLETON = 0b0_0010;
        /// Produced directly by an array constructor `[...]`.
        const CONS_ARRAY = 0b0_0100;
        /// Wrapped around a bare context value so path evaluation has an
        /// array of inputs to iterate, even for a single input document.
        const WRAPPED = 0b0_1000;
        /// Carries `{tuple, value}` pairs through a grouped path expression.
        const TUPLE_STREAM = 0b1_0000;
    }
}

pub type Object = IndexMap<String, Value>;

#[derive(Debug)]
pub struct ArrayData {
    pub items: RefCell<Vec<Value>>,
    pub flags: Cell<ArrayFlags>,
}

#[derive(Debug)]
pub struct ObjectData {
    pub entries: RefCell<Object>,
}

pub struct LambdaValue {
    pub params: Vec<String>,
    pub body: Rc<Node>,
    pub environment: Environment,
    /// Name this lambda is bound to, if declared as `$name := function(...)`.
    /// Used only to make recursive calls show a useful name in traces.
    pub name: RefCell<Option<String>>,
}

pub type NativeFnImpl = fn(&mut crate::evaluator::Evaluator, crate::position::Position, &[Value]) -> crate::error::Result<Value>;

pub struct NativeFnValue {
    pub name: &'static str,
    /// `None` means variadic (e.g. `$append`/`$sum` accept arrays directly).
    pub arity: Option<usize>,
    pub implementation: NativeFnImpl,
}

pub struct PartialValue {
    pub callee: Value,
    /// `None` marks a `?` placeholder to be filled in at call time.
    pub bound_args: Vec<Option<Value>>,
}

pub struct RegexValue {
    pub source: String,
    pub flags: String,
    pub compiled: regex::Regex,
}

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<ArrayData>),
    Object(Rc<ObjectData>),
    Lambda(Rc<LambdaValue>),
    NativeFn(Rc<NativeFnValue>),
    Partial(Rc<PartialValue>),
    Regex(Rc<RegexValue>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>, flags: ArrayFlags) -> Value {
        Value::Array(Rc::new(ArrayData {
            items: RefCell::new(items),
            flags: Cell::new(flags),
        }))
    }

    pub fn empty_sequence() -> Value {
        Value::array(vec![], ArrayFlags::SEQUENCE)
    }

    pub fn object(entries: Object) -> Value {
        Value::Object(Rc::new(ObjectData {
            entries: RefCell::new(entries),
        }))
    }

    pub fn empty_object() -> Value {
        Value::object(Object::new())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Value::Lambda(_) | Value::NativeFn(_) | Value::Partial(_)
        )
    }

    pub fn is_sequence(&self) -> bool {
        match self {
            Value::Array(a) => a.flags.get().contains(ArrayFlags::SEQUENCE),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Items of an array, or a single-element slice view for any other
    /// defined value (mirrors JSONata's "everything is a sequence of one"
    /// convention used pervasively by the path and function machinery).
    pub fn members(&self) -> Vec<Value> {
        match self {
            Value::Undefined => vec![],
            Value::Array(a) => a.items.borrow().clone(),
            other => vec![other.clone()],
        }
    }

    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(a.items.borrow().len()),
            _ => None,
        }
    }

    pub fn flags(&self) -> ArrayFlags {
        match self {
            Value::Array(a) => a.flags.get(),
            _ => ArrayFlags::empty(),
        }
    }

    pub fn set_flags(&self, flags: ArrayFlags) {
        if let Value::Array(a) = self {
            a.flags.set(flags);
        }
    }

    pub fn add_flags(&self, flags: ArrayFlags) {
        if let Value::Array(a) = self {
            a.flags.set(a.flags.get() | flags);
        }
    }

    /// Wraps `self` in a singleton array if it isn't already one, used when
    /// entering path evaluation so a bare context value can be iterated
    /// uniformly with a multi-valued one.
    pub fn wrap_in_array(self) -> Value {
        match &self {
            Value::Array(_) => self,
            Value::Undefined => self,
            _ => {
                let wrapped = Value::array(vec![self], ArrayFlags::WRAPPED);
                wrapped
            }
        }
    }

    /// Marks a plain JSON array (no `SEQUENCE` flag, e.g. straight out of
    /// `from_json` or a stored object field) so that `push_flatten` splices
    /// it into the surrounding path sequence instead of nesting it as one
    /// item, matching how `wildcard`/`descendants` results are already
    /// built with `ArrayFlags::SEQUENCE`. Leaves non-arrays and arrays that
    /// already carry the flag untouched.
    pub fn as_path_member(self) -> Value {
        match self {
            Value::Array(a) if !a.flags.get().contains(ArrayFlags::SEQUENCE) => {
                Value::array(a.items.borrow().clone(), a.flags.get() | ArrayFlags::SEQUENCE)
            }
            other => other,
        }
    }

    /// Appends `other`'s sequence semantics onto `self`, flattening one level
    /// the way consecutive path steps flatten their intermediate results.
    pub fn push_flatten(target: &mut Vec<Value>, value: Value) {
        match &value {
            Value::Array(a) if a.flags.get().contains(ArrayFlags::SEQUENCE) => {
                target.extend(a.items.borrow().iter().cloned());
            }
            Value::Undefined => {}
            _ => target.push(value),
        }
    }

    /// Creates a new result sequence from pre-flattened items, unwrapping to
    /// `Undefined`/the lone item unless `keep_array` forces it to stay an
    /// array (set by a trailing `[]` on the originating path step).
    pub fn sequence_from(items: Vec<Value>, keep_array: bool) -> Value {
        if keep_array {
            return Value::array(items, ArrayFlags::SEQUENCE | ArrayFlags::SINGLETON);
        }
        match items.len() {
            0 => Value::Undefined,
            1 => items.into_iter().next().unwrap(),
            _ => Value::array(items, ArrayFlags::SEQUENCE),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(a) => write!(f, "Array({:?})", a.items.borrow()),
            Value::Object(o) => write!(f, "Object({:?})", o.entries.borrow()),
            Value::Lambda(_) => write!(f, "<lambda>"),
            Value::NativeFn(n) => write!(f, "<native:{}>", n.name),
            Value::Partial(_) => write!(f, "<partial>"),
            Value::Regex(r) => write!(f, "<regex:/{}/{}>", r.source, r.flags),
        }
    }
}
