//! Result formatting
//!
//! Turns a [`QueryResult`] into the text printed after each statement.

use crate::executor::QueryResult;
use crate::storage::Tuple;

/// How results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Bordered text grid
    #[default]
    Table,
    /// One JSON document per statement
    Json,
}

/// Format a query result as a text grid
pub fn format_table(columns: &[String], rows: &[Tuple]) -> String {
    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (w, value) in widths.iter_mut().zip(row.values()) {
            *w = (*w).max(value.to_string().chars().count());
        }
    }

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = String::new();

    // Header
    output.push_str(&separator);
    let header = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    // Rows
    for row in rows {
        let line = row
            .values()
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:<width$} ", v.to_string(), width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", line));
    }
    if !rows.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&format!("{} row(s) returned", rows.len()));
    output
}

/// Format any statement result in the chosen format
pub fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
        OutputFormat::Table if result.is_query() => format_table(&result.columns, &result.rows),
        OutputFormat::Table => match &result.message {
            Some(message) => message.clone(),
            None => format!("{} row(s) affected", result.affected_rows),
        },
    }
}
