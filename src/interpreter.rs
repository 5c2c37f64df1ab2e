use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-normal completion of a statement or expression.
///
/// `Return` is caught by the nearest enclosing call frame; `Error`
/// propagates through every block, loop and conditional to the top level
/// of execution.  Blocks restore the previous scope on either path.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Error(RuntimeError),
}

impl Unwind {
    pub fn error<S: Into<String>>(message: S, line: usize) -> Self {
        Unwind::Error(RuntimeError::new(message, line))
    }
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

/// The tree walker.  Owns the root scope (pre-populated with the native
/// functions), the current-scope pointer that moves as blocks and calls
/// are entered and exited, and the resolver's side table mapping each
/// bound expression occurrence to its lexical depth.
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        for native in NATIVES {
            globals
                .borrow_mut()
                .define(native.name, Value::Native(Rc::new(native)));
        }

        let environment = Rc::clone(&globals);

        Interpreter {
            globals,
            environment,
            locals: HashMap::new(),
        }
    }

    /// Resolver callback: record that the occurrence `id` binds `depth`
    /// hops outward from the scope active at evaluation time.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Execute a whole program.  A runtime error terminates the run.
    pub fn interpret(&mut self, statements: &[Stmt], out: &mut dyn Write) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.execute(statement, out) {
                Ok(()) => {}
                // A stray top-level return is rejected by the resolver;
                // treat it as end of execution if it ever surfaces.
                Err(Unwind::Return(_)) => return Ok(()),
                Err(Unwind::Error(error)) => return Err(error),
            }
        }

        Ok(())
    }

    /// Evaluate a single expression, for the `evaluate` command.
    pub fn evaluate_expression(
        &mut self,
        expr: &Expr,
        out: &mut dyn Write,
    ) -> Result<Value, RuntimeError> {
        match self.evaluate(expr, out) {
            Ok(value) => Ok(value),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statement execution
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt, out: &mut dyn Write) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr, out)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr, out)?;
                let _ = writeln!(out, "{}", value);
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, out)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(scope)), out)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, out)?.is_truthy() {
                    self.execute(then_branch, out)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, out)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition, out)?.is_truthy() {
                    self.execute(body, out)?;
                }
                Ok(())
            }

            Stmt::Function(declaration) => {
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, out)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods, out),
        }
    }

    /// Run `statements` inside `scope`, restoring the previous current
    /// scope on every exit path: normal fall-off, return, runtime error.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        scope: Rc<RefCell<Environment>>,
        out: &mut dyn Write,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, scope);

        let mut result = Ok(());
        for statement in statements {
            result = self.execute(statement, out);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        out: &mut dyn Write,
    ) -> Result<(), Unwind> {
        let superclass_value = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr, out)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        let line = match expr {
                            Expr::Variable { name, .. } => name.line,
                            _ => name.line,
                        };
                        return Err(Unwind::error("Superclass must be a class.", line));
                    }
                }
            }
            None => None,
        };

        // Define the name first so method bodies can refer to the class.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods close over an extra scope binding `super` when a
        // superclass exists.
        let mut closure = Rc::clone(&self.environment);
        if let Some(superclass) = &superclass_value {
            let mut scope = Environment::with_enclosing(closure);
            scope.define("super", Value::Class(Rc::clone(superclass)));
            closure = Rc::new(RefCell::new(scope));
        }

        let mut method_table = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function =
                LoxFunction::new(Rc::clone(method), Rc::clone(&closure), is_initializer);
            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_table);

        debug!("declared class {}", name.lexeme);

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expression evaluation
    // ─────────────────────────────────────────────────────────────────────

    fn evaluate(&mut self, expr: &Expr, out: &mut dyn Write) -> Result<Value, Unwind> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner, out),

            Expr::Unary { operator, right } => {
                let value = self.evaluate(right, out)?;
                self.evaluate_unary(operator, value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, out)?;
                let right = self.evaluate(right, out)?;
                self.evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, out)?;

                // Short-circuit, yielding the operand value itself.
                let take_left = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if take_left {
                    Ok(left)
                } else {
                    self.evaluate(right, out)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value, out)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(&name.lexeme, value.clone()),
                };

                if assigned {
                    Ok(value)
                } else {
                    Err(undefined_variable(name))
                }
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee, out)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument, out)?);
                }

                self.call_value(callee, args, paren, out)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object, out)?;

                match object {
                    Value::Instance(instance) => LoxInstance::get(&instance, &name.lexeme)
                        .ok_or_else(|| {
                            Unwind::error(
                                format!("Undefined property '{}'.", name.lexeme),
                                name.line,
                            )
                        }),

                    _ => Err(Unwind::error(
                        "Only instances have properties.",
                        name.line,
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object, out)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value, out)?;
                        instance.set(&name.lexeme, value.clone());
                        Ok(value)
                    }

                    _ => Err(Unwind::error("Only instances have fields.", name.line)),
                }
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, value: Value) -> Result<Value, Unwind> {
        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(Unwind::error("Operand must be a number.", operator.line)),
            },

            TokenType::BANG => Ok(Value::Bool(!value.is_truthy())),

            _ => Err(Unwind::error(
                format!("Invalid unary operator '{}'.", operator.lexeme),
                operator.line,
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> Result<Value, Unwind> {
        fn operands_must_be_numbers(operator: &Token) -> Unwind {
            Unwind::error("Operands must be numbers.", operator.line)
        }


        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                _ => Err(Unwind::error(
                    "Operands must be two numbers or two strings.",
                    operator.line,
                )),
            },

            TokenType::MINUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(operands_must_be_numbers(operator)),
            },

            TokenType::STAR => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(operands_must_be_numbers(operator)),
            },

            // Division by zero follows IEEE-754.
            TokenType::SLASH => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(operands_must_be_numbers(operator)),
            },

            TokenType::GREATER => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(operands_must_be_numbers(operator)),
            },

            TokenType::GREATER_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(operands_must_be_numbers(operator)),
            },

            TokenType::LESS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(operands_must_be_numbers(operator)),
            },

            TokenType::LESS_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(operands_must_be_numbers(operator)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left.is_equal(&right))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!left.is_equal(&right))),

            _ => Err(Unwind::error(
                format!("Invalid binary operator '{}'.", operator.lexeme),
                operator.line,
            )),
        }
    }

    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token,
        method: &Token,
    ) -> Result<Value, Unwind> {
        let distance = match self.locals.get(&id) {
            Some(&distance) => distance,
            None => return Err(undefined_variable(keyword)),
        };

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(undefined_variable(keyword)),
        };

        // `this` lives one scope nearer than `super`.
        let instance = match Environment::get_at(&self.environment, distance - 1, "this") {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(undefined_variable(keyword)),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(&instance)))),
            None => Err(Unwind::error(
                format!("Undefined property '{}'.", method.lexeme),
                method.line,
            )),
        }
    }

    /// Dispatch a call on any callable value; anything else is a runtime
    /// error.  Arity is checked before invocation.
    fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        paren: &Token,
        out: &mut dyn Write,
    ) -> Result<Value, Unwind> {
        match callee {
            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;
                function.call(self, args, out)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), paren)?;

                let instance = Rc::new(LoxInstance::new(Rc::clone(&class)));

                if let Some(initializer) = class.find_method("init") {
                    initializer.bind(&instance).call(self, args, out)?;
                }

                Ok(Value::Instance(instance))
            }

            Value::Native(native) => {
                check_arity(native.arity, args.len(), paren)?;

                (native.func)(&args).map_err(|message| Unwind::error(message, paren.line))
            }

            _ => Err(Unwind::error(
                "Can only call functions and classes.",
                paren.line,
            )),
        }
    }

    /// Variable lookup: through the side-table depth when the resolver
    /// recorded one, otherwise through the root scope.
    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value, Unwind> {
        let value = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        value.ok_or_else(|| undefined_variable(name))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<(), Unwind> {
    if expected != got {
        return Err(Unwind::error(
            format!("Expected {} arguments but got {}.", expected, got),
            paren.line,
        ));
    }
    Ok(())
}

fn undefined_variable(name: &Token) -> Unwind {
    Unwind::error(
        format!("Undefined variable '{}'.", name.lexeme),
        name.line,
    )
}

// ─────────────────────────────────────────────────────────────────────────
// Native functions
// ─────────────────────────────────────────────────────────────────────────

const NATIVES: [NativeFunction; 2] = [
    NativeFunction {
        name: "clock",
        arity: 0,
        func: clock_native,
    },
    NativeFunction {
        name: "echo",
        arity: 1,
        func: echo_native,
    },
];

/// Whole seconds since the Unix epoch, as a Lox number.
fn clock_native(_args: &[Value]) -> Result<Value, String> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}.", e))?
        .as_secs();

    Ok(Value::Number(seconds as f64))
}

fn echo_native(args: &[Value]) -> Result<Value, String> {
    Ok(args.first().cloned().unwrap_or(Value::Nil))
}
