//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) must convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! The module **does not** print diagnostics itself; `Display` impls produce
//! the exact wire formats the CLI writes to standard error.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error, anchored at the offending lexeme.
    #[error("[line {line}] Error at {location}: {message}")]
    Parse {
        message: String,
        /// `'<lexeme>'`, or `end` when positioned at EOF.
        location: String,
        line: usize,
    },

    /// Static‑analysis (resolver) failure, anchored at the offending lexeme.
    #[error("[line {line}] Error at {location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.  `lexeme` is the raw offending
    /// lexeme; an empty lexeme (the EOF token) renders as `end`.
    pub fn parse<S: Into<String>>(line: usize, lexeme: &str, msg: S) -> Self {
        LoxError::Parse {
            message: msg.into(),
            location: locate(lexeme),
            line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, lexeme: &str, msg: S) -> Self {
        LoxError::Resolve {
            message: msg.into(),
            location: locate(lexeme),
            line,
        }
    }
}

fn locate(lexeme: &str) -> String {
    if lexeme.is_empty() {
        "end".to_string()
    } else {
        format!("'{}'", lexeme)
    }
}

/// Error raised during execution.  Carries the line of the offending token.
///
/// The message is expected to carry its own terminating punctuation, so the
/// rendered form is `<message>\n[line N]`.
#[derive(Debug, Clone, Error)]
#[error("{message}\n[line {line}]")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(message: S, line: usize) -> Self {
        RuntimeError {
            message: message.into(),
            line,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
