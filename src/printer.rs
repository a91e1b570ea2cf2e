//! Unambiguous, if ugly, s-expression rendering of syntax trees.

use crate::ast::{Expr, Stmt};
use crate::value::Value;

pub fn sexpr_program(stmts: &[Stmt]) -> String {
    stmts.iter().map(sexpr_stmt).collect::<Vec<_>>().join("\n")
}

pub fn sexpr_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(e) => format!("(; {})", sexpr(e)),
        Stmt::Print(e) => format!("(print {})", sexpr(e)),
        Stmt::Var(name, None) => format!("(var {})", name.lexeme),
        Stmt::Var(name, Some(init)) => format!("(var {} = {})", name.lexeme, sexpr(init)),
        Stmt::Block(stmts) => {
            let mut out = String::from("(block");
            for s in stmts {
                out.push(' ');
                out.push_str(&sexpr_stmt(s));
            }
            out.push(')');
            out
        }
        Stmt::If(cond, then_branch, None) => {
            format!("(if {} {})", sexpr(cond), sexpr_stmt(then_branch))
        }
        Stmt::If(cond, then_branch, Some(else_branch)) => format!(
            "(if-else {} {} {})",
            sexpr(cond),
            sexpr_stmt(then_branch),
            sexpr_stmt(else_branch)
        ),
    }
}

pub fn sexpr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(Value::Str(s)) => format!("\"{}\"", s),
        Expr::Literal(v) => v.to_string(),
        Expr::Grouping(inner) => format!("(group {})", sexpr(inner)),
        Expr::Unary(op, operand) => format!("({} {})", op.lexeme, sexpr(operand)),
        Expr::Binary(lhs, op, rhs) => format!("({} {} {})", op.lexeme, sexpr(lhs), sexpr(rhs)),
        Expr::Variable(name) => name.lexeme.clone(),
        Expr::Assign(name, value) => format!("(= {} {})", name.lexeme, sexpr(value)),
    }
}
