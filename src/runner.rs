//! Script runner
//!
//! Runs SQL scripts statement by statement against one engine. Execution is
//! fail-fast: the first failing statement stops the script, and the error
//! names the statement by its 1-based position and text.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::executor::{ExecutionEngine, QueryResult};
use crate::format::{format_result, OutputFormat};
use crate::sql::Lexer;

/// Errors that stop a script
#[derive(Error, Debug)]
pub enum ScriptError {
    /// A statement was rejected
    #[error("Error in statement #{index} ({sql}): {source}")]
    Statement {
        index: usize,
        sql: String,
        source: Error,
    },

    /// The script file could not be read
    #[error("cannot read script '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Results could not be written
    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

/// Options for a script run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How results are printed
    pub format: OutputFormat,
    /// Start from the tutorial tables rather than an empty catalog
    pub seed: bool,
    /// Print each statement before its result
    pub echo: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            seed: true,
            echo: false,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn seed(mut self, seed: bool) -> Self {
        self.seed = seed;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

/// Runs statements and scripts against a single catalog
pub struct ScriptRunner {
    engine: ExecutionEngine,
    config: RunnerConfig,
}

impl ScriptRunner {
    /// Create a runner, seeding the catalog if configured
    pub fn new(config: RunnerConfig) -> Result<Self> {
        let catalog = if config.seed {
            Catalog::with_examples()?
        } else {
            Catalog::new()
        };
        Ok(Self {
            engine: ExecutionEngine::new(catalog),
            config,
        })
    }

    /// The engine, for inspecting the catalog
    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// The run options
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Execute one statement
    pub fn run_statement(&mut self, sql: &str) -> Result<QueryResult> {
        debug!(sql, "running statement");
        self.engine.execute_sql(sql)
    }

    /// Run every statement of a script, writing each result to `out`.
    ///
    /// Returns the number of statements executed.
    pub fn run_script(&mut self, script: &str, out: &mut impl Write) -> std::result::Result<usize, ScriptError> {
        let statements = Lexer::split_statements(script);
        for (i, sql) in statements.iter().enumerate() {
            if self.config.echo {
                writeln!(out, "{};", sql)?;
            }

            match self.run_statement(sql) {
                Ok(result) => writeln!(out, "{}\n", format_result(&result, self.config.format))?,
                Err(source) => {
                    warn!(index = i + 1, %source, "statement rejected, stopping script");
                    return Err(ScriptError::Statement {
                        index: i + 1,
                        sql: sql.clone(),
                        source,
                    });
                }
            }
        }
        Ok(statements.len())
    }

    /// Read and run a script file
    pub fn run_file(&mut self, path: &Path, out: &mut impl Write) -> std::result::Result<usize, ScriptError> {
        let script = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.run_script(&script, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(runner: &mut ScriptRunner, script: &str) -> (std::result::Result<usize, ScriptError>, String) {
        let mut out = Vec::new();
        let result = runner.run_script(script, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_run_script() {
        let mut runner = ScriptRunner::new(RunnerConfig::new()).unwrap();
        let (result, out) = run(
            &mut runner,
            "-- tutorial\nSELECT first_name FROM customers WHERE id = 1;\n\
             UPDATE customers SET score = 1 WHERE id = 1;",
        );
        assert_eq!(result.unwrap(), 2);
        assert!(out.contains("| Maria      |"));
        assert!(out.contains("1 row(s) updated"));
    }

    #[test]
    fn test_script_stops_at_first_error() {
        let mut runner = ScriptRunner::new(RunnerConfig::new()).unwrap();
        let (result, out) = run(
            &mut runner,
            "DELETE FROM orders;\nSELECT nope FROM customers;\nDELETE FROM customers;",
        );
        let err = result.unwrap_err();
        assert!(matches!(
            &err,
            ScriptError::Statement { index: 2, source: Error::UnknownColumn(_, _), .. }
        ));
        assert!(err
            .to_string()
            .starts_with("Error in statement #2 (SELECT nope FROM customers): "));
        assert!(out.contains("4 row(s) deleted"));
        assert_eq!(runner.engine().catalog().get_table("customers").unwrap().row_count(), 5);
    }

    #[test]
    fn test_echo_and_empty_catalog() {
        let config = RunnerConfig::new().seed(false).echo(true);
        let mut runner = ScriptRunner::new(config).unwrap();
        assert!(runner.engine().catalog().list_tables().is_empty());

        let (result, out) = run(&mut runner, "CREATE TABLE t (a INT)");
        assert_eq!(result.unwrap(), 1);
        assert!(out.starts_with("CREATE TABLE t (a INT);\nTable 't' created"));
    }
}
