//! A tree-walk interpreter for the Lox language.
//!
//! See [Crafting Interpreters](https://craftinginterpreters.com/).
//!
//! Source text flows through [`scanner`] → [`parser`] → [`eval`]; [`interpreter`] ties the
//! phases together.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Limitations
//!
//! - Only expressions, variables, blocks and `if` are implemented: no loops, functions or
//! classes.  Their keywords are reserved nonetheless.
//! - Variables are resolved dynamically by walking the scope chain.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod ast;
pub mod diag;
pub mod env;
pub mod eval;
pub mod interpreter;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod token;
pub mod value;
