use std::fmt;

use crate::diag::Position;
use crate::value::Value;

/// Categories of "words" produced by `Scanner`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    // Single-character punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character operators
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Eof,
}

impl TokenKind {
    /// Return the keyword spelled `text`, if any.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "and" => TokenKind::And,
            "class" => TokenKind::Class,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "fun" => TokenKind::Fun,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "nil" => TokenKind::Nil,
            "or" => TokenKind::Or,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }

    /// Keywords the parser resumes at after a syntax error.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::LeftParen => "LEFT_PAREN",
            TokenKind::RightParen => "RIGHT_PAREN",
            TokenKind::LeftBrace => "LEFT_BRACE",
            TokenKind::RightBrace => "RIGHT_BRACE",
            TokenKind::Comma => "COMMA",
            TokenKind::Dot => "DOT",
            TokenKind::Minus => "MINUS",
            TokenKind::Plus => "PLUS",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Slash => "SLASH",
            TokenKind::Star => "STAR",
            TokenKind::Bang => "BANG",
            TokenKind::BangEqual => "BANG_EQUAL",
            TokenKind::Equal => "EQUAL",
            TokenKind::EqualEqual => "EQUAL_EQUAL",
            TokenKind::Greater => "GREATER",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::Less => "LESS",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::String => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::And => "AND",
            TokenKind::Class => "CLASS",
            TokenKind::Else => "ELSE",
            TokenKind::False => "FALSE",
            TokenKind::Fun => "FUN",
            TokenKind::For => "FOR",
            TokenKind::If => "IF",
            TokenKind::Nil => "NIL",
            TokenKind::Or => "OR",
            TokenKind::Print => "PRINT",
            TokenKind::Return => "RETURN",
            TokenKind::Super => "SUPER",
            TokenKind::This => "THIS",
            TokenKind::True => "TRUE",
            TokenKind::Var => "VAR",
            TokenKind::While => "WHILE",
            TokenKind::Eof => "EOF",
        };
        write!(f, "{}", name)
    }
}

/// A scanned token.  Immutable once produced.
#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text the token was scanned from.
    pub lexeme: String,
    /// Value of `STRING` and `NUMBER` tokens.
    pub literal: Option<Value>,
    pub line: Position,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: &str, literal: Option<Value>, line: Position) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            literal,
            line,
        }
    }

    /// Synthesize a token that did not come from source text.
    pub fn synthetic(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, None, 1)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Some(Value::Str(s)) => write!(f, "{} {} \"{}\"", self.kind, self.lexeme, s),
            Some(v) => write!(f, "{} {} {}", self.kind, self.lexeme, v),
            None => write!(f, "{} {}", self.kind, self.lexeme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_words_are_keywords() {
        assert_eq!(TokenKind::keyword("while"), Some(TokenKind::While));
        assert_eq!(TokenKind::keyword("class"), Some(TokenKind::Class));
        assert_eq!(TokenKind::keyword("While"), None);
        assert_eq!(TokenKind::keyword("whilst"), None);
    }

    #[test]
    fn synchronization_keywords() {
        assert!(TokenKind::Return.starts_statement());
        assert!(TokenKind::Class.starts_statement());
        assert!(!TokenKind::Else.starts_statement());
        assert!(!TokenKind::Semicolon.starts_statement());
    }

    #[test]
    fn token_dump_format() {
        let tok = Token::new(TokenKind::Number, "1.5", Some(Value::Number(1.5)), 3);
        assert_eq!(tok.to_string(), "NUMBER 1.5 1.5");
        let tok = Token::new(TokenKind::String, "\"hi\"", Some(Value::from("hi")), 1);
        assert_eq!(tok.to_string(), "STRING \"hi\" \"hi\"");
        assert_eq!(Token::synthetic(TokenKind::Eof, "").to_string(), "EOF ");
    }
}
