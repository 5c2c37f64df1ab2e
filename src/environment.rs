use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::value::Value;

/// One frame in the lexical chain: a name→value map plus a reference to the
/// enclosing scope.  The root scope has no parent, holds the natives, and
/// doubles as the global scope; it lives for the whole run.
///
/// `get`/`assign` walk outward.  `get_at`/`assign_at` address a specific
/// ancestor by hop count with no fallback; the resolver has proven the
/// binding to exist there, so a miss surfaces as `None` for the caller to
/// report.
#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Unconditional insert-or-overwrite in *this* scope.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("define '{}' in scope", name);
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Overwrite in the nearest enclosing scope that contains `name`.
    /// Returns `false` if no scope on the chain does.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        let target = Environment::ancestor(env, distance)?;
        let value = target.borrow().values.get(name).cloned();
        value
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        match Environment::ancestor(env, distance) {
            Some(target) => {
                target.borrow_mut().values.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// The scope `distance` hops outward from `env` (0 = `env` itself).
    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}
