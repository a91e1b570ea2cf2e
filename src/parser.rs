//! Recursive-descent parser.
//!
//! Syntax errors are reported to a `Reporter` and the parser resynchronizes at the next
//! statement boundary so that independent errors are all reported in one pass.

use std::fmt;

use tracing::debug;

use crate::ast::{Expr, ReplLine, Stmt};
use crate::diag::{CompileError, ParseError, Reporter};
use crate::token::{Token, TokenKind};
use crate::value::Value;

type ParseResult<T> = Result<T, CompileError>;

/// Deepest nesting of groupings, unary operators, operator chains and statements accepted.
const MAX_NESTING: usize = 128;

/// Parse a whole program.
pub fn parse(tokens: Vec<Token>, reporter: &mut dyn Reporter) -> Vec<Stmt> {
    Parser::new(tokens, reporter).parse_program()
}

/// Parse a line of interactive input, see `Parser::parse_repl`.
pub fn parse_repl(tokens: Vec<Token>, reporter: &mut dyn Reporter) -> ReplLine {
    Parser::new(tokens, reporter).parse_repl()
}

pub struct Parser<'r> {
    tokens: Vec<Token>,
    current: usize,
    nesting: usize,
    reporter: &'r mut dyn Reporter,
}

impl fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("current", &self.peek())
            .finish()
    }
}

enum ReplItem {
    Stmt(Stmt),
    Value(Expr),
}

impl<'r> Parser<'r> {
    pub fn new(mut tokens: Vec<Token>, reporter: &'r mut dyn Reporter) -> Parser<'r> {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenKind::Eof, "", None, line));
        }
        Parser {
            tokens,
            current: 0,
            nesting: 0,
            reporter,
        }
    }

    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut prg = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                prg.push(stmt);
            }
        }
        debug!("parsed {} statements", prg.len());
        prg
    }

    /// Like `parse_program` but a final expression lacking its semicolon is returned as a
    /// value to echo instead of being a syntax error.
    pub fn parse_repl(&mut self) -> ReplLine {
        let mut line = ReplLine::default();
        while !self.is_at_end() {
            let start = self.current;
            match self.repl_declaration() {
                Ok(ReplItem::Stmt(stmt)) => line.stmts.push(stmt),
                Ok(ReplItem::Value(expr)) => line.value = Some(expr),
                Err(e) => self.recover(e, start),
            }
        }
        line
    }

    /// Parse a single expression.
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.expression()
    }

    fn repl_declaration(&mut self) -> ParseResult<ReplItem> {
        match self.peek().kind {
            TokenKind::Var | TokenKind::Print | TokenKind::If | TokenKind::LeftBrace => {
                Ok(ReplItem::Stmt(self.declaration_body()?))
            }
            _ => {
                let expr = self.expression()?;
                if self.is_at_end() {
                    Ok(ReplItem::Value(expr))
                } else {
                    self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
                    Ok(ReplItem::Stmt(Stmt::Expression(expr)))
                }
            }
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let start = self.current;
        match self.declaration_body() {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                self.recover(e, start);
                None
            }
        }
    }

    fn declaration_body(&mut self) -> ParseResult<Stmt> {
        if self.matches(&[TokenKind::Var]) {
            self.var_decl()
        } else {
            self.statement()
        }
    }

    /// Parse variable declaration.
    /// `var` has been consumed.
    fn var_decl(&mut self) -> ParseResult<Stmt> {
        let name = self
            .consume(TokenKind::Identifier, "Expect variable name.")?
            .clone();
        let init = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var(name, init))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        self.nested(Self::statement_body)
    }

    fn statement_body(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Print => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
                Ok(Stmt::Print(expr))
            }
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Stmt::Block(self.block()?))
            }
            TokenKind::If => {
                self.advance();
                self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
                let cond = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.matches(&[TokenKind::Else]) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If(cond, then_branch, else_branch))
            }
            _ => {
                let expr = self.expression()?;
                self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    /// `{` has been consumed.
    ///
    /// Too much nesting inside the block abandons the rest of it, up to its closing brace.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let start = self.current;
            match self.declaration_body() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) if e.error == ParseError::TooDeep => {
                    self.reporter.report(e);
                    self.skip_block();
                    return Ok(stmts);
                }
                Err(e) => self.recover(e, start),
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    /// Discard tokens up to and including the `}` closing the current block.
    fn skip_block(&mut self) {
        let mut open = 1;
        while !self.is_at_end() {
            match self.advance().kind {
                TokenKind::LeftBrace => open += 1,
                TokenKind::RightBrace => {
                    open -= 1;
                    if open == 0 {
                        return;
                    }
                }
                _ => (),
            }
        }
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let lhs = self.equality()?;
        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let rhs = self.nested(Self::assignment)?;
            if let Expr::Variable(name) = lhs {
                return Ok(Expr::assign(name, rhs));
            }
            // Not worth resynchronizing: the parser is not confused.
            self.reporter.report(CompileError::at_token(
                &equals,
                ParseError::InvalidAssignmentTarget,
            ));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.left_assoc(
            &[TokenKind::BangEqual, TokenKind::EqualEqual],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.left_assoc(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.left_assoc(&[TokenKind::Minus, TokenKind::Plus], Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.left_assoc(&[TokenKind::Slash, TokenKind::Star], Self::unary)
    }

    /// Fold `operand (op operand)*` to the left.
    ///
    /// Each fold deepens the tree by one level and counts as nesting until the chain ends.
    fn left_assoc(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let nesting = self.nesting;
        let result = self.fold_left(operators, operand);
        self.nesting = nesting;
        result
    }

    fn fold_left(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;
        while self.matches(operators) {
            let op = self.previous().clone();
            self.enter()?;
            let rhs = operand(self)?;
            expr = Expr::binary(expr, op, rhs);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            Ok(Expr::unary(op, self.nested(Self::unary)?))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::False => Expr::Literal(Value::Bool(false)),
            TokenKind::True => Expr::Literal(Value::Bool(true)),
            TokenKind::Nil => Expr::Literal(Value::Nil),
            TokenKind::Number | TokenKind::String => {
                Expr::Literal(token.literal.clone().unwrap_or(Value::Nil))
            }
            TokenKind::Identifier => Expr::Variable(token),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::grouping(expr));
            }
            _ => {
                return Err(CompileError::at_token(
                    &token,
                    ParseError::ExpectedExpression,
                ))
            }
        };
        self.advance();
        Ok(expr)
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: fn(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.enter()?;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    fn enter(&mut self) -> ParseResult<()> {
        if self.nesting >= MAX_NESTING {
            return Err(CompileError::at_token(self.peek(), ParseError::TooDeep));
        }
        self.nesting += 1;
        Ok(())
    }

    /// Report `error` raised by the declaration starting at token `start` and skip to the
    /// next statement boundary.
    fn recover(&mut self, error: CompileError, start: usize) {
        self.reporter.report(error);
        // A statement keyword right after consumed tokens already begins the next statement.
        if self.current > start && self.peek().kind.starts_statement() {
            return;
        }
        self.synchronize();
    }

    /// Discard tokens until a statement boundary.  The current token is always discarded.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            if self.peek().kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|k| self.check(*k)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, expected: TokenKind, msg: &'static str) -> ParseResult<&Token> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            let error = ParseError::Expected(msg);
            Err(CompileError::at_token(self.peek(), error))
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
}
