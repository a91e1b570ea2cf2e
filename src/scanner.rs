//! Lexical analyzer

use tracing::debug;

use crate::diag::{CompileError, ParseError, Position, Reporter};
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Turn source text into a sequence of tokens.
pub fn scan(source: &str, reporter: &mut dyn Reporter) -> Vec<Token> {
    Scanner::new(source).scan_tokens(reporter)
}

/// Turn source text into a sequence of tokens.
///
/// Lexical errors are reported and the offending input skipped, so one pass can report
/// several of them.
#[derive(Debug)]
pub struct Scanner<'s> {
    source: &'s str,
    // Byte offsets of the first character of the token being scanned and of the next
    // character to consume.
    start: usize,
    current: usize,
    line: Position,
}

impl<'s> Scanner<'s> {
    /// Creates a new scanner operating on `source`.
    pub fn new(source: &'s str) -> Scanner<'s> {
        Scanner {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scan the whole input.  The last token is always `Eof`.
    pub fn scan_tokens(mut self, reporter: &mut dyn Reporter) -> Vec<Token> {
        let mut tokens = vec![];
        loop {
            let token = self.get_token(reporter);
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        debug!("scanned {} tokens", tokens.len());
        tokens
    }

    /// Scan next token and return it.
    pub fn get_token(&mut self, reporter: &mut dyn Reporter) -> Token {
        loop {
            self.start = self.current;
            let ch = match self.advance() {
                None => return self.make_token(TokenKind::Eof),
                Some(ch) => ch,
            };
            let kind = match ch {
                '\n' => {
                    self.line += 1;
                    continue;
                }
                ' ' | '\t' | '\r' => continue,
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                '{' => TokenKind::LeftBrace,
                '}' => TokenKind::RightBrace,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '-' => TokenKind::Minus,
                '+' => TokenKind::Plus,
                ';' => TokenKind::Semicolon,
                '*' => TokenKind::Star,
                '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
                '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
                '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
                '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
                '/' => {
                    if self.peek() == Some('/') {
                        self.skip_comment();
                        continue;
                    }
                    TokenKind::Slash
                }
                '"' => match self.scan_string(reporter) {
                    Some(token) => return token,
                    None => continue,
                },
                '0'..='9' => return self.scan_number(),
                'a'..='z' | 'A'..='Z' | '_' => return self.scan_identifier(),
                _ => {
                    reporter.report(CompileError::at_line(self.line, ParseError::UnexpectedChar));
                    continue;
                }
            };
            return self.make_token(kind);
        }
    }

    fn scan_string(&mut self, reporter: &mut dyn Reporter) -> Option<Token> {
        let first_line = self.line;
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\n') => self.line += 1,
                Some(_) => (),
                None => {
                    reporter.report(CompileError::at_line(
                        first_line,
                        ParseError::UnterminatedString,
                    ));
                    return None;
                }
            }
        }

        // Trim the surrounding quotes.
        let value = &self.source[self.start + 1..self.current - 1];
        let mut token = self.make_token(TokenKind::String);
        token.literal = Some(Value::from(value));
        token.line = first_line;
        Some(token)
    }

    fn scan_number(&mut self) -> Token {
        self.skip_digits();
        // A trailing dot is not part of the number.
        if self.peek() == Some('.') && self.peek_next().map_or(false, |ch| ch.is_ascii_digit()) {
            self.advance();
            self.skip_digits();
        }

        let mut token = self.make_token(TokenKind::Number);
        // Digits with at most one inner dot always parse.
        let n = token.lexeme.parse::<f64>().unwrap_or(f64::NAN);
        token.literal = Some(Value::Number(n));
        token
    }

    fn scan_identifier(&mut self) -> Token {
        while let Some(ch) = self.peek() {
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        self.make_token(TokenKind::keyword(text).unwrap_or(TokenKind::Identifier))
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek().map_or(false, |ch| ch.is_ascii_digit()) {
            self.advance();
        }
    }

    fn either(&mut self, expected: char, matched: TokenKind, unmatched: TokenKind) -> TokenKind {
        if self.peek() == Some(expected) {
            self.advance();
            matched
        } else {
            unmatched
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let lexeme = &self.source[self.start..self.current];
        Token::new(kind, lexeme, None, self.line)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.current += ch.len_utf8();
        Some(ch)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.source[self.current..].chars().nth(1)
    }
}
