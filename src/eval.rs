use std::io;
use std::io::prelude::*;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::ast::{Expr, Stmt};
use crate::diag::Position;
use crate::env::Env;
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Error aborting evaluation, located at the line of the offending token.
#[derive(Debug, Error)]
#[error("{kind}\n[line {line}]")]
pub struct RuntimeError {
    pub line: Position,
    pub kind: RuntimeErrorKind,
}

#[derive(Debug, Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Cannot write output: {0}")]
    Io(#[source] io::Error),
    #[error("Execution interrupted.")]
    Interrupted,
}

/// Tree-walking evaluator.
///
/// The global scope outlives calls to `interpret` so that successive programs share state.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    env: Rc<Env>,
    interrupt: Arc<AtomicBool>,
    // Line of the last token evaluated, for errors not tied to a token.
    line: Position,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W) -> Evaluator<'a, W> {
        Evaluator {
            output,
            env: Env::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
            line: 1,
        }
    }

    /// Flag that makes evaluation fail with `Interrupted` before the next statement.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    /// Execute `stmts` in order, stopping at the first runtime error.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        let result = stmts.iter().try_for_each(|stmt| self.execute(stmt));
        if let Err(e) = &result {
            trace!("runtime error: {:?}", e);
        }
        result
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        if self.interrupt.swap(false, Ordering::Relaxed) {
            return Err(self.error(RuntimeErrorKind::Interrupted));
        }
        trace!("execute {}", stmt);

        match stmt {
            Stmt::Expression(e) => {
                self.evaluate(e)?;
            }
            Stmt::Print(e) => {
                let v = self.evaluate(e)?;
                if let Err(err) = writeln!(self.output, "{}", v) {
                    return Err(self.error(RuntimeErrorKind::Io(err)));
                }
            }
            Stmt::Var(name, init) => {
                let v = match init {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                self.env.define(&name.lexeme, v);
            }
            Stmt::Block(stmts) => self.execute_block(stmts)?,
            Stmt::If(cond, then_branch, else_branch) => {
                if self.evaluate(cond)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }
        };
        Ok(())
    }

    /// Run `stmts` in a fresh child scope.  The enclosing scope is restored even when a
    /// statement fails.
    fn execute_block(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        let scope = Env::with_parent(Some(self.env.clone()));
        let enclosing = std::mem::replace(&mut self.env, scope);
        trace!("enter block at depth {}", self.env.depth());

        let result = stmts.iter().try_for_each(|stmt| self.execute(stmt));

        trace!("leave block, scope was {}", self.env);
        self.env = enclosing;
        result
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Grouping(e) => self.evaluate(e),
            Expr::Variable(name) => {
                self.line = name.line;
                self.env.get(name)
            }
            Expr::Assign(name, rhs) => {
                let v = self.evaluate(rhs)?;
                self.line = name.line;
                self.env.assign(name, v.clone())?;
                Ok(v)
            }
            Expr::Unary(op, operand) => {
                let v = self.evaluate(operand)?;
                self.line = op.line;
                match (op.kind, v) {
                    (TokenKind::Minus, Value::Number(n)) => Ok(Value::Number(-n)),
                    (TokenKind::Minus, _) => {
                        Err(error_at(op, RuntimeErrorKind::OperandMustBeNumber))
                    }
                    // `!`
                    (_, v) => Ok(Value::Bool(!v.is_truthy())),
                }
            }
            Expr::Binary(lhs, op, rhs) => {
                let l = self.evaluate(lhs)?;
                let r = self.evaluate(rhs)?;
                self.line = op.line;
                binary(op, l, r)
            }
        }
    }

    fn error(&self, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError {
            line: self.line,
            kind,
        }
    }
}

fn binary(op: &Token, l: Value, r: Value) -> Result<Value, RuntimeError> {
    let v = match op.kind {
        TokenKind::Plus => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::Str(a), Value::Str(b)) => Value::from(format!("{}{}", a, b)),
            _ => {
                return Err(error_at(
                    op,
                    RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
                ))
            }
        },
        TokenKind::Minus => {
            let (a, b) = numbers(op, &l, &r)?;
            Value::Number(a - b)
        }
        TokenKind::Star => {
            let (a, b) = numbers(op, &l, &r)?;
            Value::Number(a * b)
        }
        TokenKind::Slash => {
            let (a, b) = numbers(op, &l, &r)?;
            Value::Number(a / b)
        }
        TokenKind::Greater => {
            let (a, b) = numbers(op, &l, &r)?;
            Value::Bool(a > b)
        }
        TokenKind::GreaterEqual => {
            let (a, b) = numbers(op, &l, &r)?;
            Value::Bool(a >= b)
        }
        TokenKind::Less => {
            let (a, b) = numbers(op, &l, &r)?;
            Value::Bool(a < b)
        }
        TokenKind::LessEqual => {
            let (a, b) = numbers(op, &l, &r)?;
            Value::Bool(a <= b)
        }
        TokenKind::EqualEqual => Value::Bool(l == r),
        // `!=`
        _ => Value::Bool(l != r),
    };
    Ok(v)
}

fn numbers(op: &Token, l: &Value, r: &Value) -> Result<(f64, f64), RuntimeError> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(error_at(op, RuntimeErrorKind::OperandsMustBeNumbers)),
    }
}

fn error_at(token: &Token, kind: RuntimeErrorKind) -> RuntimeError {
    RuntimeError {
        line: token.line,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, None, 3)
    }

    fn num(n: f64) -> Expr {
        Expr::Literal(Value::Number(n))
    }

    fn string(s: &str) -> Expr {
        Expr::Literal(Value::from(s))
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(tok(TokenKind::Identifier, name))
    }

    fn bin(lhs: Expr, kind: TokenKind, lexeme: &str, rhs: Expr) -> Expr {
        Expr::binary(lhs, tok(kind, lexeme), rhs)
    }

    fn eval_expr(expr: &Expr) -> Result<Value, RuntimeError> {
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out);
        let val = evaluator.evaluate(expr)?;
        assert!(out.is_empty());
        Ok(val)
    }

    fn eval_prg(prg: &[Stmt]) -> Result<String, RuntimeError> {
        let mut out: Vec<u8> = Vec::new();
        Evaluator::new(&mut out).interpret(prg)?;
        let output = String::from_utf8(out).expect("error while converting output");
        Ok(output)
    }

    #[test]
    fn literal() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr(&num(1.0))?, Value::Number(1.0));
        assert_eq!(eval_expr(&Expr::grouping(string("a")))?, Value::from("a"));
        Ok(())
    }

    #[test]
    fn unary_minus() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::unary(tok(TokenKind::Minus, "-"), num(1.0)))?,
            Value::Number(-1.0)
        );
        Ok(())
    }

    #[test]
    fn unary_minus_on_string() {
        match eval_expr(&Expr::unary(tok(TokenKind::Minus, "-"), string("foo"))) {
            Err(e) => assert_eq!(e.to_string(), "Operand must be a number.\n[line 3]"),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn logical_not_uses_truthiness() -> Result<(), RuntimeError> {
        let not = |e| Expr::unary(tok(TokenKind::Bang, "!"), e);
        let nil = Expr::Literal(Value::Nil);
        assert_eq!(eval_expr(&not(nil))?, Value::Bool(true));
        assert_eq!(eval_expr(&not(num(0.0)))?, Value::Bool(false));
        assert_eq!(eval_expr(&not(string("")))?, Value::Bool(false));
        Ok(())
    }

    #[test]
    fn arithmetic() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&bin(num(1.0), TokenKind::Minus, "-", num(3.0)))?,
            Value::Number(-2.0)
        );
        assert_eq!(
            eval_expr(&bin(num(6.0), TokenKind::Slash, "/", num(2.0)))?,
            Value::Number(3.0)
        );
        assert_eq!(
            eval_expr(&bin(
                num(1.0),
                TokenKind::Plus,
                "+",
                bin(num(2.0), TokenKind::Star, "*", num(3.0))
            ))?,
            Value::Number(7.0)
        );
        Ok(())
    }

    #[test]
    fn division_by_zero_is_infinite() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&bin(num(1.0), TokenKind::Slash, "/", num(0.0)))?,
            Value::Number(f64::INFINITY)
        );
        Ok(())
    }

    #[test]
    fn string_concatenation() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&bin(
                bin(string("a"), TokenKind::Plus, "+", string("b")),
                TokenKind::Plus,
                "+",
                string("c")
            ))?,
            Value::from("abc")
        );
        Ok(())
    }

    #[test]
    fn mixed_addition() {
        match eval_expr(&bin(num(1.0), TokenKind::Plus, "+", string("1"))) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
                line: 3,
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn comparison_requires_numbers() {
        match eval_expr(&bin(string("a"), TokenKind::Less, "<", string("b"))) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::OperandsMustBeNumbers,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn comparisons() -> Result<(), RuntimeError> {
        let cmp = |kind, lexeme, a, b| eval_expr(&bin(num(a), kind, lexeme, num(b)));
        let (yes, no) = (Value::Bool(true), Value::Bool(false));
        assert_eq!(cmp(TokenKind::Less, "<", 1.0, 2.0)?, yes);
        assert_eq!(cmp(TokenKind::Less, "<", 2.0, 2.0)?, no);
        assert_eq!(cmp(TokenKind::LessEqual, "<=", 2.0, 2.0)?, yes);
        assert_eq!(cmp(TokenKind::Greater, ">", 3.0, 2.0)?, yes);
        assert_eq!(cmp(TokenKind::GreaterEqual, ">=", 1.0, 2.0)?, no);
        Ok(())
    }

    #[test]
    fn equality_across_kinds() -> Result<(), RuntimeError> {
        let eq = |a, b| eval_expr(&bin(a, TokenKind::EqualEqual, "==", b));
        let ne = |a, b| eval_expr(&bin(a, TokenKind::BangEqual, "!=", b));
        assert_eq!(eq(num(2.0), num(2.0))?, Value::Bool(true));
        assert_eq!(eq(num(1.0), string("1"))?, Value::Bool(false));
        assert_eq!(
            eq(Expr::Literal(Value::Nil), Expr::Literal(Value::Nil))?,
            Value::Bool(true)
        );
        assert_eq!(
            eq(Expr::Literal(Value::Nil), Expr::Literal(Value::Bool(false)))?,
            Value::Bool(false)
        );
        assert_eq!(ne(string("a"), string("a"))?, Value::Bool(false));
        assert_eq!(ne(num(0.0), Expr::Literal(Value::Nil))?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn print_stmt() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_prg(&[
                Stmt::Print(num(42.0)),
                Stmt::Print(bin(num(7.0), TokenKind::Slash, "/", num(2.0))),
                Stmt::Print(string("s")),
            ])?,
            "42\n3.5\ns\n"
        );
        Ok(())
    }

    #[test]
    fn var_without_initializer_is_nil() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_prg(&[
                Stmt::Var(tok(TokenKind::Identifier, "foo"), None),
                Stmt::Print(var("foo")),
            ])?,
            "nil\n"
        );
        Ok(())
    }

    #[test]
    fn redeclaring_a_variable_overwrites_it() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_prg(&[
                Stmt::Var(tok(TokenKind::Identifier, "foo"), Some(num(1.0))),
                Stmt::Var(tok(TokenKind::Identifier, "foo"), Some(num(2.0))),
                Stmt::Print(var("foo")),
            ])?,
            "2\n"
        );
        Ok(())
    }

    #[test]
    fn assignment_yields_assigned_value() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_prg(&[
                Stmt::Var(tok(TokenKind::Identifier, "a"), None),
                Stmt::Print(Expr::assign(tok(TokenKind::Identifier, "a"), num(5.0))),
                Stmt::Print(var("a")),
            ])?,
            "5\n5\n"
        );
        Ok(())
    }

    #[test]
    fn set_unknown_var() {
        match eval_prg(&[Stmt::Expression(Expr::assign(
            tok(TokenKind::Identifier, "foo"),
            num(42.0),
        ))]) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::UndefinedVariable(name),
                ..
            }) if name == "foo" => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn scope_is_restored_after_failing_block() {
        let mut out: Vec<u8> = Vec::new();
        let mut e = Evaluator::new(&mut out);
        let failing = Stmt::Block(vec![
            Stmt::Var(tok(TokenKind::Identifier, "inner"), Some(num(1.0))),
            Stmt::Print(var("missing")),
        ]);
        assert!(e.interpret(&[failing]).is_err());
        assert_eq!(e.env.depth(), 0);
        assert!(e.evaluate(&var("inner")).is_err());
    }

    #[test]
    fn if_else_branches() -> Result<(), RuntimeError> {
        let if_stmt = |cond| {
            Stmt::If(
                cond,
                Box::new(Stmt::Print(string("then"))),
                Some(Box::new(Stmt::Print(string("else")))),
            )
        };
        assert_eq!(
            eval_prg(&[
                if_stmt(num(0.0)),
                if_stmt(Expr::Literal(Value::Nil)),
                Stmt::If(
                    Expr::Literal(Value::Bool(false)),
                    Box::new(Stmt::Print(string("no"))),
                    None
                ),
            ])?,
            "then\nelse\n"
        );
        Ok(())
    }

    #[test]
    fn interrupt_stops_before_next_statement() {
        let mut out: Vec<u8> = Vec::new();
        let mut e = Evaluator::new(&mut out);
        e.interrupt_handle().store(true, Ordering::Relaxed);
        match e.interpret(&[Stmt::Print(num(1.0))]) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::Interrupted,
                ..
            }) => (),
            r => panic!("unexpected output: {:?}", r),
        }
        // The flag is consumed by the interruption.
        assert!(e.interpret(&[Stmt::Print(num(2.0))]).is_ok());
        assert_eq!(out, b"2\n");
    }
}
