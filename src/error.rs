//! Error types for PrimerDB
//!
//! This module defines all error types used by the parser, catalog and engine.

use thiserror::Error;

/// The main error type for PrimerDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Lexer error: invalid number format at position {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Catalog Errors ==========
    #[error("Catalog error: table '{0}' not found")]
    UnknownTable(String),

    #[error("Catalog error: table '{0}' already exists")]
    DuplicateTable(String),

    #[error("Catalog error: column '{0}' not found in table '{1}'")]
    UnknownColumn(String, String),

    #[error("Catalog error: column '{0}' already exists in table '{1}'")]
    DuplicateColumn(String, String),

    // ========== Type Errors ==========
    #[error("Type error: expected {expected} values, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Type error: cannot use {found} value as {expected}")]
    TypeMismatch { expected: String, found: String },

    #[error("Type error: value too large for column '{0}'")]
    ValueTooLarge(String),

    #[error("Type error: invalid date literal '{0}'")]
    InvalidDate(String),

    // ========== Execution Errors ==========
    #[error("Execution error: invalid projection - {0}")]
    InvalidProjection(String),

    #[error("Execution error: constraint violation - {0}")]
    ConstraintViolation(String),

    #[error("Execution error: division by zero")]
    DivisionByZero,

    #[error("Execution error: unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Build a type mismatch error from anything displayable
    pub fn type_mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Result type alias for PrimerDB operations
pub type Result<T> = std::result::Result<T, Error>;
