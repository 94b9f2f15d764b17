//! PrimerDB - an in-memory SQL teaching harness
//!
//! This library runs tutorial SQL scripts against an in-memory catalog:
//! - SQL parsing (lexer, parser, AST)
//! - Catalog and row storage, seeded with the tutorial tables
//! - Query execution (planner, evaluator, aggregates, executor)
//! - Result formatting and a fail-fast script runner

pub mod catalog;
pub mod error;
pub mod executor;
pub mod format;
pub mod logging;
pub mod runner;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
pub use executor::{ExecutionEngine, QueryResult};
pub use runner::{RunnerConfig, ScriptError, ScriptRunner};
