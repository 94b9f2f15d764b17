//! SQL module
//!
//! Lexer, parser and AST for the supported SQL dialect.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use parser::Parser;
