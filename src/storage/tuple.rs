//! Tuple and Value types for PrimerDB
//!
//! This module defines how data values are represented in memory.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use super::date::parse_date;
use crate::error::{Error, Result};

/// A value in the database
///
/// Stored values are `Null`, `Integer`, `Text` or `Date`. `Boolean` and
/// `Float` only come out of expression evaluation (predicates, AVG, division).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value (64-bit)
    Integer(i64),
    /// Float value (64-bit)
    Float(f64),
    /// String value
    Text(String),
    /// Calendar date
    Date(NaiveDate),
}

// Floats compare bitwise so values can key hash maps (DISTINCT, GROUP BY)
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
        }
    }
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to convert to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
            Value::Date(_) => "DATE",
        }
    }

    /// Compare two values (for WHERE clauses, ORDER BY, etc.)
    ///
    /// NULL sorts before everything. Text compares with a date when it is a
    /// valid date literal. Returns `None` for incompatible types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),

            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),

            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),

            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Text(b)) => parse_date(b).ok().map(|b| a.cmp(&b)),
            (Value::Text(a), Value::Date(b)) => parse_date(a).ok().map(|a| a.cmp(b)),

            _ => None,
        }
    }

    /// Total ordering for sorting; incomparable values are treated as equal
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.compare(other).unwrap_or(Ordering::Equal)
    }

    /// Add two values
    pub fn checked_add(&self, other: &Value) -> Result<Value> {
        self.arithmetic(other, "+", i64::checked_add, |a, b| a + b)
    }

    /// Subtract two values
    pub fn checked_sub(&self, other: &Value) -> Result<Value> {
        self.arithmetic(other, "-", i64::checked_sub, |a, b| a - b)
    }

    /// Multiply two values
    pub fn checked_mul(&self, other: &Value) -> Result<Value> {
        self.arithmetic(other, "*", i64::checked_mul, |a, b| a * b)
    }

    /// Divide two values
    pub fn checked_div(&self, other: &Value) -> Result<Value> {
        if !self.is_null() && other.is_zero() {
            return Err(Error::DivisionByZero);
        }
        self.arithmetic(other, "/", i64::checked_div, |a, b| a / b)
    }

    /// Remainder of two values
    pub fn checked_rem(&self, other: &Value) -> Result<Value> {
        if !self.is_null() && other.is_zero() {
            return Err(Error::DivisionByZero);
        }
        self.arithmetic(other, "%", i64::checked_rem, |a, b| a % b)
    }

    fn is_zero(&self) -> bool {
        matches!(self, Value::Integer(0)) || matches!(self, Value::Float(f) if *f == 0.0)
    }

    fn arithmetic(
        &self,
        other: &Value,
        op: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Integer(a), Value::Integer(b)) => int_op(*a, *b)
                .map(Value::Integer)
                .ok_or_else(|| Error::ExecutionError(format!("integer overflow in {} {} {}", a, op, b))),
            (Value::Float(_), Value::Integer(_) | Value::Float(_))
            | (Value::Integer(_), Value::Float(_)) => {
                let (a, b) = (self.as_f64(), other.as_f64());
                match (a, b) {
                    (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
                    _ => Err(Error::type_mismatch("numeric", other.type_name())),
                }
            }
            (Value::Integer(_) | Value::Float(_), _) => {
                Err(Error::type_mismatch("numeric", other.type_name()))
            }
            _ => Err(Error::type_mismatch("numeric", self.type_name())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A tuple (row) in the database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tuple {
    /// Values in this tuple
    values: Vec<Value>,
}

impl Tuple {
    /// Create a new tuple from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Create an empty tuple
    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    /// Get a value by index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Set a value by index
    pub fn set(&mut self, index: usize, value: Value) {
        if index < self.values.len() {
            self.values[index] = value;
        }
    }

    /// Add a value to the tuple
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Remove the value at an index
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        (index < self.values.len()).then(|| self.values.remove(index))
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if tuple is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the tuple and return the values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Project specific columns
    pub fn project(&self, indices: &[usize]) -> Tuple {
        let values = indices
            .iter()
            .filter_map(|&i| self.values.get(i).cloned())
            .collect();
        Tuple::new(values)
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Tuple::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Tuple {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
