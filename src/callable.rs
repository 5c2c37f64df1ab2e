use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::interpreter::{Interpreter, Unwind};
use crate::value::Value;

/// A host-implemented function living in the root scope.
///
/// The implementation returns a value or an error message; the interpreter
/// anchors the message at the call site's line.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

/// A user function: its declaration, the environment captured at the point
/// the declaration was executed, and whether it is a class `init` method.
#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A bound method: the original capture extended by a fresh scope in
    /// which `this` is the instance.
    pub fn bind(&self, instance: &Rc<LoxInstance>) -> LoxFunction {
        let mut scope = Environment::with_enclosing(Rc::clone(&self.closure));
        scope.define("this", Value::Instance(Rc::clone(instance)));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(scope)),
            is_initializer: self.is_initializer,
        }
    }

    /// The call protocol: a fresh scope under the captured environment,
    /// parameters bound to arguments, the body executed as a block inside
    /// that scope.  A `Return` unwind is caught here; normal fall-off
    /// yields `nil`.  An initializer always yields the bound instance.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        out: &mut dyn Write,
    ) -> Result<Value, Unwind> {
        debug!("calling <fn {}>", self.declaration.name.lexeme);

        let mut scope = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            scope.define(&param.lexeme, argument);
        }

        let result =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(scope)), out);

        match result {
            Ok(()) => {
                if self.is_initializer {
                    self.bound_instance()
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Unwind::Return(value)) => {
                if self.is_initializer {
                    self.bound_instance()
                } else {
                    Ok(value)
                }
            }

            Err(unwind) => Err(unwind),
        }
    }

    /// `this` from the closure an initializer was bound with.
    fn bound_instance(&self) -> Result<Value, Unwind> {
        Environment::get_at(&self.closure, 0, "this").ok_or_else(|| {
            Unwind::error(
                "Undefined variable 'this'.",
                self.declaration.name.line,
            )
        })
    }
}
