//! Data types for PrimerDB
//!
//! This module defines the SQL column types a table can declare and the
//! mutation-time check that values agree with them.

use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};
use crate::storage::date::parse_date;
use crate::storage::Value;

/// SQL Data Types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    /// 64-bit integer (INT, INTEGER, SMALLINT, BIGINT)
    Integer,
    /// Fixed-length character string
    Char(usize),
    /// Variable-length character string with max length
    Varchar(usize),
    /// Unlimited text
    Text,
    /// Calendar date
    Date,
}

impl DataType {
    /// Check if this type is a string type
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DataType::Char(_) | DataType::Varchar(_) | DataType::Text
        )
    }

    /// Maximum character length, for bounded string types
    pub fn max_length(&self) -> Option<usize> {
        match self {
            DataType::Char(n) | DataType::Varchar(n) => Some(*n),
            _ => None,
        }
    }

    /// Check a value against this type and return the value to store.
    ///
    /// NULL passes through untouched; nullability is the column's concern.
    /// Text is accepted by DATE columns only when it is a valid `YYYY-MM-DD`
    /// literal. Nothing else is converted.
    pub fn check(&self, column: &str, value: Value) -> Result<Value> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (DataType::Integer, v @ Value::Integer(_)) => Ok(v),
            (DataType::Date, v @ Value::Date(_)) => Ok(v),
            (DataType::Date, Value::Text(s)) => parse_date(&s)
                .map(Value::Date)
                .map_err(|_| Error::type_mismatch(self, format!("TEXT '{}'", s))),
            (t, Value::Text(s)) if t.is_string() => {
                if let Some(max) = t.max_length() {
                    if s.chars().count() > max {
                        return Err(Error::ValueTooLarge(column.to_string()));
                    }
                }
                Ok(Value::Text(s))
            }
            (t, v) => Err(Error::type_mismatch(t, v.type_name())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Char(n) => write!(f, "CHAR({})", n),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
            DataType::Text => write!(f, "TEXT"),
            DataType::Date => write!(f, "DATE"),
        }
    }
}
