//! PrimerDB - script runner and interactive shell
//!
//! Runs the given SQL scripts (or `-e` SQL) against a fresh catalog seeded
//! with the tutorial tables. Without either, starts an interactive shell.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as _;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use primerdb::format::{format_result, OutputFormat};
use primerdb::logging::init_logging;
use primerdb::sql::Lexer;
use primerdb::{RunnerConfig, ScriptRunner};

/// Command-line arguments
#[derive(clap::Parser)]
#[command(name = "primerdb", about = "Run tutorial SQL against an in-memory database", version)]
struct Args {
    /// SQL script files, run in order against one catalog
    scripts: Vec<PathBuf>,

    /// SQL to run instead of script files
    #[arg(short = 'e', long = "execute", value_name = "SQL", conflicts_with = "scripts")]
    execute: Option<String>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Start with an empty catalog instead of the tutorial tables
    #[arg(long)]
    no_seed: bool,

    /// Print each statement before its result
    #[arg(long)]
    echo: bool,

    /// Log filter directive (RUST_LOG takes precedence)
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    init_logging(&args.log_level)?;

    let config = RunnerConfig::new()
        .format(args.format)
        .seed(!args.no_seed)
        .echo(args.echo);
    let mut runner = ScriptRunner::new(config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(sql) = &args.execute {
        runner.run_script(sql, &mut out)?;
    } else if !args.scripts.is_empty() {
        for path in &args.scripts {
            runner.run_file(path, &mut out)?;
        }
    } else {
        drop(out);
        Shell::new(runner)?.run()?;
    }
    Ok(())
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .tables            List all tables
  .schema [table]    Show table schemas
  .quit              Exit PrimerDB

Statements end with a semicolon and may span several lines:
  SELECT country, COUNT(*) FROM customers
  GROUP BY country;
"#
    );
}

/// An interactive shell. Errors are printed and the shell carries on.
struct Shell {
    runner: ScriptRunner,
    editor: DefaultEditor,
}

impl Shell {
    fn new(runner: ScriptRunner) -> anyhow::Result<Self> {
        Ok(Self {
            runner,
            editor: DefaultEditor::new()?,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        println!(
            "PrimerDB {}. Enter .help for instructions.",
            env!("CARGO_PKG_VERSION")
        );

        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() {
                "primerdb> "
            } else {
                "      ...> "
            };
            let line = match self.editor.readline(prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    buffer.clear();
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(error) => return Err(error.into()),
            };

            let trimmed = line.trim();
            if buffer.is_empty() && trimmed.starts_with('.') {
                self.editor.add_history_entry(trimmed)?;
                if !self.execute_command(trimmed) {
                    break;
                }
                continue;
            }
            if buffer.is_empty() && trimmed.is_empty() {
                continue;
            }

            buffer.push_str(&line);
            buffer.push('\n');
            if trimmed.ends_with(';') {
                let input = std::mem::take(&mut buffer);
                self.editor.add_history_entry(input.trim())?;
                self.execute_sql(&input);
            }
        }
        Ok(())
    }

    fn execute_sql(&mut self, input: &str) {
        for sql in Lexer::split_statements(input) {
            match self.runner.run_statement(&sql) {
                Ok(result) => println!("{}", format_result(&result, self.runner.config().format)),
                Err(error) => eprintln!("Error: {}", error),
            }
        }
    }

    /// Handle a dot command; returns false when the shell should exit
    fn execute_command(&mut self, input: &str) -> bool {
        let catalog = self.runner.engine().catalog();
        let mut parts = input.split_whitespace();

        match (parts.next(), parts.next()) {
            (Some(".help"), _) => print_help(),
            (Some(".quit" | ".exit"), _) => return false,
            (Some(".tables"), _) => {
                let tables = catalog.list_tables();
                if tables.is_empty() {
                    println!("No tables found.");
                }
                for table in tables {
                    println!("{}", table);
                }
            }
            (Some(".schema"), Some(name)) => match catalog.table_info(name) {
                Ok(info) => print!("{}", info),
                Err(error) => eprintln!("Error: {}", error),
            },
            (Some(".schema"), None) => {
                for name in catalog.list_tables() {
                    if let Ok(info) = catalog.table_info(&name) {
                        println!("{}", info);
                    }
                }
            }
            (Some(command), _) => {
                eprintln!("Unknown command: {}", command);
                eprintln!("Type '.help' for available commands.");
            }
            (None, _) => {}
        }
        true
    }
}
