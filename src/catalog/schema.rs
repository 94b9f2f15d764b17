//! Schema definitions for PrimerDB
//!
//! This module defines table schemas and column metadata.

use super::types::DataType;
use crate::storage::Value;
use serde::Serialize;
use std::collections::HashMap;

/// Column definition in a table
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Column position (0-indexed)
    pub position: usize,
    /// Is this column nullable?
    pub nullable: bool,
    /// Default value used when an INSERT omits the column
    pub default: Option<Value>,
    /// Is this part of the primary key?
    pub primary_key: bool,
}

impl Column {
    /// Create a new column with minimal required fields
    pub fn new(name: impl Into<String>, data_type: DataType, position: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            position,
            nullable: true,
            default: None,
            primary_key: false,
        }
    }

    /// Set nullable flag
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set default value
    pub fn default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set primary key flag
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        if pk {
            self.nullable = false;
        }
        self
    }

    /// Value an omitted column receives
    pub fn fill_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

/// Table schema - defines the structure of a table
///
/// Column lookups are case-insensitive, names keep the case they were
/// declared with.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,
    /// Lowercased column name to index mapping
    #[serde(skip)]
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema from a list of columns
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut schema = Self::new();
        for col in columns {
            schema.add_column(col);
        }
        schema
    }

    /// Add a column to the schema
    pub fn add_column(&mut self, mut column: Column) {
        column.position = self.columns.len();
        self.name_to_index
            .insert(column.name.to_lowercase(), column.position);
        self.columns.push(column);
    }

    /// Remove a column by name, returning its former position
    pub fn remove_column(&mut self, name: &str) -> Option<usize> {
        let index = self.get_column_index(name)?;
        self.columns.remove(index);
        self.reindex();
        Some(index)
    }

    fn reindex(&mut self) {
        self.name_to_index.clear();
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.position = i;
            self.name_to_index.insert(column.name.to_lowercase(), i);
        }
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.get_column_index(name).map(|idx| &self.columns[idx])
    }

    /// Get column index by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(&name.to_lowercase()).copied()
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }

    /// Get primary key column indices
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.position)
            .collect()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Name of the first column declared twice, if any
    pub fn duplicate_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .enumerate()
            .find(|(i, c)| self.name_to_index.get(&c.name.to_lowercase()) != Some(i))
            .map(|(_, c)| c.name.as_str())
    }
}

/// Table definition - name plus schema
#[derive(Debug, Clone, Serialize)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Table schema
    pub schema: Schema,
}

impl TableDef {
    /// Create a new table definition
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the table schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.schema.get_column(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation() {
        let mut schema = Schema::new();
        schema.add_column(Column::new("id", DataType::Integer, 0).primary_key(true));
        schema.add_column(Column::new("first_name", DataType::Varchar(50), 1).nullable(false));
        schema.add_column(Column::new("country", DataType::Varchar(50), 2));

        assert_eq!(schema.column_count(), 3);
        assert!(schema.has_column("id"));
        assert!(schema.has_column("First_Name"));
        assert!(!schema.has_column("unknown"));

        let id_col = schema.get_column("id").unwrap();
        assert!(id_col.primary_key);
        assert!(!id_col.nullable);
        assert_eq!(schema.primary_key_indices(), vec![0]);
    }

    #[test]
    fn test_remove_column_reindexes() {
        let mut schema = Schema::from_columns(vec![
            Column::new("id", DataType::Integer, 0),
            Column::new("email", DataType::Text, 0),
            Column::new("phone", DataType::Varchar(15), 0),
        ]);

        assert_eq!(schema.remove_column("email"), Some(1));
        assert_eq!(schema.get_column_index("phone"), Some(1));
        assert_eq!(schema.get_column("phone").unwrap().position, 1);
        assert_eq!(schema.remove_column("email"), None);
    }

    #[test]
    fn test_duplicate_column_detection() {
        let schema = Schema::from_columns(vec![
            Column::new("id", DataType::Integer, 0),
            Column::new("ID", DataType::Integer, 0),
        ]);
        assert_eq!(schema.duplicate_column(), Some("id"));
    }
}
