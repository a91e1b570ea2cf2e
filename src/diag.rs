//! Compile-time errors and the run-state that reports them.

use std::io::Write;

use thiserror::Error;

use crate::eval::RuntimeError;
use crate::token::{Token, TokenKind};

/// Line number (starting at one).
pub type Position = u32;

/// What went wrong while scanning or parsing.
#[derive(Debug, PartialEq, Clone, Error)]
pub enum ParseError {
    #[error("Unexpected character.")]
    UnexpectedChar,
    #[error("Unterminated string.")]
    UnterminatedString,
    #[error("{0}")]
    Expected(&'static str),
    #[error("Expect expression.")]
    ExpectedExpression,
    #[error("Invalid assignment target.")]
    InvalidAssignmentTarget,
    #[error("Too much nesting.")]
    TooDeep,
}

/// A lexical or syntax error located in the source.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("[line {line}] Error{location}: {error}")]
pub struct CompileError {
    pub line: Position,
    /// Empty for lexical errors, otherwise `" at end"` or `" at '<lexeme>'"`.
    pub location: String,
    pub error: ParseError,
}

impl CompileError {
    /// Error not tied to a token.
    pub fn at_line(line: Position, error: ParseError) -> CompileError {
        CompileError {
            line,
            location: String::new(),
            error,
        }
    }

    /// Error reported at the offending token.
    pub fn at_token(token: &Token, error: ParseError) -> CompileError {
        let location = if token.kind == TokenKind::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        CompileError {
            line: token.line,
            location,
            error,
        }
    }
}

/// Sink for compile errors.  Scanning and parsing keep going after reporting.
pub trait Reporter {
    fn report(&mut self, error: CompileError);
}

impl Reporter for Vec<CompileError> {
    fn report(&mut self, error: CompileError) {
        self.push(error);
    }
}

/// Per-run error state.
///
/// Writes one diagnostic per line to `sink` and remembers which kinds of error happened so
/// that the driver can pick an exit code.
#[derive(Debug)]
pub struct Diagnostics<W: Write> {
    sink: W,
    had_error: bool,
    had_runtime_error: bool,
}

impl<W: Write> Diagnostics<W> {
    pub fn new(sink: W) -> Diagnostics<W> {
        Diagnostics {
            sink,
            had_error: false,
            had_runtime_error: false,
        }
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        self.emit(error);
        self.had_runtime_error = true;
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Forget previous errors (between REPL lines).
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Process exit code matching the errors seen so far.
    pub fn exit_code(&self) -> i32 {
        if self.had_error {
            65
        } else if self.had_runtime_error {
            70
        } else {
            0
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn emit(&mut self, msg: &dyn std::fmt::Display) {
        if let Err(e) = writeln!(self.sink, "{}", msg) {
            tracing::warn!("cannot write diagnostic: {}", e);
        }
    }
}

impl<W: Write> Reporter for Diagnostics<W> {
    fn report(&mut self, error: CompileError) {
        self.emit(&error);
        self.had_error = true;
    }
}
