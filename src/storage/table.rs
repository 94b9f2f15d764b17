//! Table storage for PrimerDB
//!
//! A table is a definition plus its rows, held in insertion order.
//! Mutations go through [`Table::prepare_row`] and [`Table::replace_rows`],
//! which enforce declared types, NOT NULL and primary-key uniqueness before
//! anything is written.

use std::collections::HashSet;

use super::tuple::{Tuple, Value};
use crate::catalog::{Column, Schema, TableDef};
use crate::error::{Error, Result};

/// A table combining schema and rows
#[derive(Debug, Clone)]
pub struct Table {
    /// Table definition (metadata)
    def: TableDef,
    /// Rows in insertion order
    rows: Vec<Tuple>,
}

impl Table {
    /// Create a new, empty table
    pub fn new(def: TableDef) -> Self {
        Self {
            def,
            rows: Vec::new(),
        }
    }

    /// Get table name
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Get table schema
    pub fn schema(&self) -> &Schema {
        self.def.schema()
    }

    /// Get table definition
    pub fn definition(&self) -> &TableDef {
        &self.def
    }

    /// All rows, in insertion order
    pub fn rows(&self) -> &[Tuple] {
        &self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check one full row of values against the schema.
    ///
    /// Returns the row to store (date literals become dates). Fails on
    /// arity, type, length or NOT NULL violations.
    pub fn prepare_row(&self, values: Vec<Value>) -> Result<Tuple> {
        let columns = self.schema().columns();
        if values.len() != columns.len() {
            return Err(Error::ArityMismatch {
                expected: columns.len(),
                found: values.len(),
            });
        }

        columns
            .iter()
            .zip(values)
            .map(|(column, value)| self.check_value(column, value))
            .collect()
    }

    /// Check a single value against a column
    pub fn check_value(&self, column: &Column, value: Value) -> Result<Value> {
        let value = column.data_type.check(&column.name, value)?;
        if value.is_null() && !column.nullable {
            return Err(Error::ConstraintViolation(format!(
                "column '{}' of table '{}' cannot be NULL",
                column.name,
                self.name()
            )));
        }
        Ok(value)
    }

    /// Append already prepared rows, checking the primary key across the
    /// existing and new rows first
    pub fn append_rows(&mut self, new_rows: Vec<Tuple>) -> Result<usize> {
        let count = new_rows.len();
        self.check_primary_key(self.rows.iter().chain(new_rows.iter()))?;
        self.rows.extend(new_rows);
        Ok(count)
    }

    /// Replace the full row set, checking the primary key first
    pub fn replace_rows(&mut self, rows: Vec<Tuple>) -> Result<()> {
        self.check_primary_key(rows.iter())?;
        self.rows = rows;
        Ok(())
    }

    /// Keep only the rows for which `keep` is true; returns the number removed
    pub fn retain_rows(&mut self, keep: &[bool]) -> usize {
        let before = self.rows.len();
        let mut flags = keep.iter();
        self.rows.retain(|_| *flags.next().unwrap_or(&true));
        before - self.rows.len()
    }

    /// Remove every row; returns the number removed
    pub fn truncate(&mut self) -> usize {
        let count = self.rows.len();
        self.rows.clear();
        count
    }

    /// Append a column, filling existing rows with its default or NULL
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.schema().has_column(&column.name) {
            return Err(Error::DuplicateColumn(
                column.name.clone(),
                self.name().to_string(),
            ));
        }

        let fill = match self.check_value(&column, column.fill_value()) {
            Ok(value) => value,
            // An empty table can take a NOT NULL column with no default.
            Err(Error::ConstraintViolation(_)) if self.rows.is_empty() => Value::Null,
            Err(Error::ConstraintViolation(_)) => {
                return Err(Error::ConstraintViolation(format!(
                    "cannot add NOT NULL column '{}' without a default to non-empty table '{}'",
                    column.name,
                    self.name()
                )))
            }
            Err(e) => return Err(e),
        };

        for row in &mut self.rows {
            row.push(fill.clone());
        }
        self.def.schema.add_column(column);
        Ok(())
    }

    /// Drop a column and its values
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        if !self.schema().has_column(name) {
            return Err(Error::UnknownColumn(
                name.to_string(),
                self.name().to_string(),
            ));
        }
        if self.schema().column_count() == 1 {
            return Err(Error::ConstraintViolation(format!(
                "cannot drop '{}', the only column of table '{}'",
                name,
                self.name()
            )));
        }

        if let Some(index) = self.def.schema.remove_column(name) {
            for row in &mut self.rows {
                row.remove(index);
            }
        }
        Ok(())
    }

    fn check_primary_key<'a>(&self, rows: impl Iterator<Item = &'a Tuple>) -> Result<()> {
        let key_indices = self.schema().primary_key_indices();
        if key_indices.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::new();
        for row in rows {
            let key = row.project(&key_indices);
            if !seen.insert(key.clone()) {
                let key = key
                    .values()
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Error::ConstraintViolation(format!(
                    "duplicate primary key ({}) in table '{}'",
                    key,
                    self.name()
                )));
            }
        }
        Ok(())
    }
}
