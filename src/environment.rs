//! Lexically-scoped variable bindings. An `Environment` is a cheap handle
//! (`Rc`) onto a scope with a parent pointer; cloning an `Environment` shares
//! the same scope rather than copying bindings, so a lambda can capture its
//! defining environment and keep it alive for as long as the closure lives.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

struct Scope {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Environment>,
}

#[derive(Clone)]
pub struct Environment(Rc<Scope>);

impl Environment {
    pub fn root() -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// Creates a new child scope whose lookups fall back to `self`.
    pub fn child(&self) -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn bind(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Walks the parent chain, returning `None` if `name` is bound nowhere
    /// in the chain (the caller turns that into a `ReferenceError`) and
    /// `Some` otherwise — including `Some(Value::Undefined)` for a name
    /// that is bound but whose value is itself `Undefined` (e.g. a lambda
    /// parameter the caller didn't supply an argument for).
    pub fn try_lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        match &self.0.parent {
            Some(parent) => parent.try_lookup(name),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_lookup() {
        let env = Environment::root();
        env.bind("x", Value::Number(42.0));
        assert_eq!(env.try_lookup("x").unwrap().as_f64(), Some(42.0));
        assert!(env.try_lookup("missing").is_none());
    }

    #[test]
    fn lookup_through_parent() {
        let parent = Environment::root();
        parent.bind("x", Value::Number(1.0));
        let child = parent.child();
        child.bind("y", Value::Number(2.0));
        assert_eq!(child.try_lookup("x").unwrap().as_f64(), Some(1.0));
        assert_eq!(child.try_lookup("y").unwrap().as_f64(), Some(2.0));
        assert!(parent.try_lookup("y").is_none());
    }

    #[test]
    fn child_shadows_parent() {
        let parent = Environment::root();
        parent.bind("x", Value::Number(1.0));
        let child = parent.child();
        child.bind("x", Value::Number(2.0));
        assert_eq!(parent.try_lookup("x").unwrap().as_f64(), Some(1.0));
        assert_eq!(child.try_lookup("x").unwrap().as_f64(), Some(2.0));
    }

    #[test]
    fn unbound_name_is_none_even_when_a_sibling_binding_exists() {
        let env = Environment::root();
        env.bind("x", Value::Undefined);
        assert!(env.try_lookup("x").is_some());
        assert!(env.try_lookup("y").is_none());
    }
}
