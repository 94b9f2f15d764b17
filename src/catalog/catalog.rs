//! System Catalog for PrimerDB
//!
//! The catalog owns every table, schema and rows alike. It is a plain value:
//! whoever holds it has exclusive access, so nothing here locks.

use indexmap::IndexMap;

use super::schema::{Column, Schema, TableDef};
use super::types::DataType;
use crate::error::{Error, Result};
use crate::storage::{Table, Value};

/// A schema change applied by ALTER TABLE
#[derive(Debug, Clone)]
pub enum AlterAction {
    /// Append a column
    AddColumn(Column),
    /// Remove a column by name
    DropColumn(String),
}

/// System Catalog - the in-memory table store
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    /// Tables keyed by lowercased name, in creation order
    tables: IndexMap<String, Table>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table
    pub fn create_table(&mut self, name: &str, schema: Schema) -> Result<&Table> {
        let key = name.to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(Error::DuplicateTable(name.to_string()));
        }
        if let Some(column) = schema.duplicate_column() {
            return Err(Error::DuplicateColumn(column.to_string(), name.to_string()));
        }

        let entry = self
            .tables
            .entry(key)
            .or_insert_with(|| Table::new(TableDef::new(name, schema)));
        Ok(entry)
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Get a table by name for modification
    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// Drop a table, schema and rows
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .shift_remove(&name.to_lowercase())
            .map(|_| ())
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Add or remove a column in place
    pub fn alter_table(&mut self, name: &str, action: AlterAction) -> Result<()> {
        let table = self.get_table_mut(name)?;
        match action {
            AlterAction::AddColumn(column) => table.add_column(column),
            AlterAction::DropColumn(column) => table.drop_column(&column),
        }
    }

    /// List all table names, in creation order
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.values().map(|t| t.name().to_string()).collect()
    }

    /// Get table schema info as a formatted string (for .schema command)
    pub fn table_info(&self, name: &str) -> Result<String> {
        let table = self.get_table(name)?;
        let mut info = format!("Table: {} ({} rows)\n", table.name(), table.row_count());
        info.push_str("Columns:\n");

        for col in table.schema().columns() {
            let mut flags = Vec::new();
            if col.primary_key {
                flags.push("PRIMARY KEY".to_string());
            }
            if !col.nullable {
                flags.push("NOT NULL".to_string());
            }
            if let Some(default) = &col.default {
                flags.push(format!("DEFAULT {}", default));
            }

            let flags_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            info.push_str(&format!("  {} {}{}\n", col.name, col.data_type, flags_str));
        }

        Ok(info)
    }
}

/// Builder for creating tables with a fluent API
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    /// Start building a new table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Add a column
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let position = self.columns.len();
        self.columns.push(Column::new(name, data_type, position));
        self
    }

    /// Add a primary key column (INTEGER PRIMARY KEY)
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        let position = self.columns.len();
        self.columns
            .push(Column::new(name, DataType::Integer, position).primary_key(true));
        self
    }

    /// Add a NOT NULL column
    pub fn column_not_null(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let position = self.columns.len();
        self.columns
            .push(Column::new(name, data_type, position).nullable(false));
        self
    }

    /// Add a row of initial values, in column order
    pub fn row<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    /// Build the table in the catalog
    pub fn build(self, catalog: &mut Catalog) -> Result<()> {
        let schema = Schema::from_columns(self.columns);
        catalog.create_table(&self.name, schema)?;

        let table = catalog.get_table_mut(&self.name)?;
        let rows = self
            .rows
            .into_iter()
            .map(|values| table.prepare_row(values))
            .collect::<Result<Vec<_>>>()?;
        table.append_rows(rows)?;
        Ok(())
    }
}
