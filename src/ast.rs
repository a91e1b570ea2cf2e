use std::fmt;

use crate::token::Token;
use crate::value::Value;

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Expression(Expr),
    Print(Expr),
    Var(Token, Option<Expr>),
    Block(Vec<Stmt>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
}

/// Operator nodes keep their token for error reporting.
///
/// `Unary` operators are `!` and `-`.  `Binary` operators are the arithmetic, comparison and
/// equality tokens.
#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Literal(Value),
    Grouping(Box<Expr>),
    Unary(Token, Box<Expr>),
    Binary(Box<Expr>, Token, Box<Expr>),
    Variable(Token),
    Assign(Token, Box<Expr>),
}

/// A line of interactive input: declarations optionally followed by a bare expression whose
/// value is echoed back.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ReplLine {
    pub stmts: Vec<Stmt>,
    pub value: Option<Expr>,
}

impl Expr {
    pub fn unary(op: Token, operand: Expr) -> Expr {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(lhs: Expr, op: Token, rhs: Expr) -> Expr {
        Expr::Binary(Box::new(lhs), op, Box::new(rhs))
    }

    pub fn grouping(inner: Expr) -> Expr {
        Expr::Grouping(Box::new(inner))
    }

    pub fn assign(name: Token, value: Expr) -> Expr {
        Expr::Assign(name, Box::new(value))
    }

    fn is_parenthesized(&self) -> bool {
        matches!(
            self,
            Expr::Grouping(_) | Expr::Unary(..) | Expr::Binary(..) | Expr::Assign(..)
        )
    }
}

// The `Display` impls below render Lox source with every operator application
// parenthesized.  Parsing the output gives back a tree that evaluates identically.

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Str(s)) => write!(f, "\"{}\"", s),
            Expr::Literal(Value::Number(n)) => write!(f, "{}", n),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Grouping(inner) if inner.is_parenthesized() => write!(f, "{}", inner),
            Expr::Grouping(inner) => write!(f, "({})", inner),
            Expr::Unary(op, operand) => write!(f, "({}{})", op.lexeme, operand),
            Expr::Binary(lhs, op, rhs) => write!(f, "({} {} {})", lhs, op.lexeme, rhs),
            Expr::Variable(name) => write!(f, "{}", name.lexeme),
            Expr::Assign(name, value) => write!(f, "({} = {})", name.lexeme, value),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Expression(e) => write!(f, "{};", e),
            Stmt::Print(e) => write!(f, "print {};", e),
            Stmt::Var(name, None) => write!(f, "var {};", name.lexeme),
            Stmt::Var(name, Some(init)) => write!(f, "var {} = {};", name.lexeme, init),
            Stmt::Block(stmts) => {
                write!(f, "{{")?;
                for stmt in stmts {
                    write!(f, " {}", stmt)?;
                }
                write!(f, " }}")
            }
            Stmt::If(cond, then_branch, None) => write!(f, "if ({}) {}", cond, then_branch),
            Stmt::If(cond, then_branch, Some(else_branch)) => {
                // Brace a nested else-less `if` so that the `else` stays with this one.
                if let Stmt::If(_, _, None) = **then_branch {
                    write!(
                        f,
                        "if ({}) {{ {} }} else {}",
                        cond, then_branch, else_branch
                    )
                } else {
                    write!(f, "if ({}) {} else {}", cond, then_branch, else_branch)
                }
            }
        }
    }
}
