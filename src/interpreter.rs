//! API to control the interpreter.

use std::io::prelude::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::diag::CompileError;
use crate::eval::{Evaluator, RuntimeError};
use crate::parser;
use crate::scanner;
use crate::value::Value;

/// Tree-walk interpreter.
///
/// # Example
///
/// Invoke the interpreter a first time to declare a variable then additional times to use
/// it:
///
/// ```
/// # use tlox::interpreter::{Interpreter, LoxError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// interp.run("var greeting = \"hello\";")?;
/// interp.run("if (greeting == \"hello\") print greeting + \" world\";")?;
/// interp.run("{ var greeting = 6 / 2; print greeting; } print greeting;")?;
///
/// assert_eq!(output, b"hello world\n3\nhello\n");
/// # Ok::<(), LoxError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Errors found during lexical or syntactic analysis.  Nothing was executed.
    #[error("{}", join_lines(.0))]
    Compile(Vec<CompileError>),

    /// Error occurring during evaluation.  Side effects of earlier statements happened.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn join_lines(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        Interpreter {
            evaluator: Evaluator::new(output),
        }
    }

    /// Scan, parse and execute a program.
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        let mut errors = vec![];
        let tokens = scanner::scan(source, &mut errors);
        let prg = parser::parse(tokens, &mut errors);
        if !errors.is_empty() {
            debug!("{} compile errors, not executing", errors.len());
            return Err(LoxError::Compile(errors));
        }
        self.evaluator.interpret(&prg)?;
        Ok(())
    }

    /// Like `run` but a trailing expression without semicolon is evaluated and its value
    /// returned.
    pub fn run_repl_line(&mut self, source: &str) -> Result<Option<Value>, LoxError> {
        let mut errors = vec![];
        let tokens = scanner::scan(source, &mut errors);
        let line = parser::parse_repl(tokens, &mut errors);
        if !errors.is_empty() {
            return Err(LoxError::Compile(errors));
        }
        self.evaluator.interpret(&line.stmts)?;
        match &line.value {
            Some(e) => Ok(Some(self.evaluator.evaluate(e)?)),
            None => Ok(None),
        }
    }

    /// Setting the returned flag aborts the running program with an `Interrupted` error.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.evaluator.interrupt_handle()
    }
}
