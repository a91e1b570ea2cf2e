//! Lexical scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::eval::{RuntimeError, RuntimeErrorKind};
use crate::token::Token;
use crate::value::Value;

/// One scope of variable bindings, chained to the scope enclosing it.
///
/// The global scope is the only one without parent.
#[derive(Debug)]
pub struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<String, Value>>,
}

impl Env {
    pub fn new() -> Rc<Env> {
        Self::with_parent(None)
    }

    pub fn with_parent(parent: Option<Rc<Env>>) -> Rc<Env> {
        Rc::new(Env {
            parent,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Bind `name` in this scope, replacing any previous binding here.
    pub fn define(&self, name: &str, val: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), val);
    }

    /// Overwrite the innermost existing binding of `name`.
    pub fn assign(&self, name: &Token, val: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(&name.lexeme) {
            *slot = val;
            return Ok(());
        }
        match self.parent.as_ref() {
            Some(parent) => parent.assign(name, val),
            None => Err(undefined(name)),
        }
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(v) = self.bindings.borrow().get(&name.lexeme) {
            return Ok(v.clone());
        }
        match self.parent.as_ref() {
            Some(parent) => parent.get(name),
            None => Err(undefined(name)),
        }
    }

    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.depth() + 1)
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError {
        line: name.line,
        kind: RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()),
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.borrow();
        let mut names: Vec<_> = bindings.keys().collect();
        names.sort();
        write!(f, "{{")?;
        for (i, name) in names.into_iter().enumerate() {
            let sep = if i == 0 { "" } else { ", " };
            write!(f, "{}{}={}", sep, name, bindings[name])?;
        }
        write!(f, "}}")?;
        if let Some(parent) = &self.parent {
            write!(f, " -> {}", parent)?;
        }
        Ok(())
    }
}
