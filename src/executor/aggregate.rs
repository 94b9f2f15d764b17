//! Aggregate accumulators
//!
//! One accumulator per aggregate call per partition. NULL inputs are ignored
//! by every aggregate; `COUNT(*)` counts rows regardless.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::sql::ast::Expr;
use crate::storage::Value;

/// Accumulates aggregate values. An enum rather than a trait object so a
/// partition can keep its accumulators in a plain vector.
#[derive(Debug, Clone)]
pub enum Accumulator {
    Average { count: i64, sum: Value },
    Count(i64),
    CountRows(i64),
    Max(Option<Value>),
    Min(Option<Value>),
    Sum(Option<Value>),
}

impl Accumulator {
    /// Create an accumulator for an aggregate name
    fn new(name: &str, counts_rows: bool) -> Result<Self> {
        Ok(match name {
            "AVG" => Self::Average {
                count: 0,
                sum: Value::Integer(0),
            },
            "COUNT" if counts_rows => Self::CountRows(0),
            "COUNT" => Self::Count(0),
            "MAX" => Self::Max(None),
            "MIN" => Self::Min(None),
            "SUM" => Self::Sum(None),
            _ => return Err(Error::UnknownFunction(name.to_string())),
        })
    }

    /// Adds a value to the accumulator
    fn add(&mut self, value: Value) -> Result<()> {
        match (self, value) {
            (Self::CountRows(c), _) => *c += 1,
            (_, Value::Null) => {}

            (Self::Average { count, sum }, value) => {
                *sum = sum.checked_add(&value)?;
                *count += 1;
            }
            (Self::Count(c), _) => *c += 1,

            (Self::Max(max @ None), value) | (Self::Min(max @ None), value) => {
                *max = Some(value)
            }
            (Self::Max(Some(max)), value) => {
                if Self::order(&value, max)?.is_gt() {
                    *max = value
                }
            }
            (Self::Min(Some(min)), value) => {
                if Self::order(&value, min)?.is_lt() {
                    *min = value
                }
            }

            (Self::Sum(sum @ None), value) => *sum = Some(Value::Integer(0).checked_add(&value)?),
            (Self::Sum(Some(sum)), value) => *sum = sum.checked_add(&value)?,
        }
        Ok(())
    }

    fn order(a: &Value, b: &Value) -> Result<std::cmp::Ordering> {
        a.compare(b)
            .ok_or_else(|| Error::type_mismatch(b.type_name(), a.type_name()))
    }

    /// Returns the aggregate value
    fn value(self) -> Result<Value> {
        Ok(match self {
            Self::Average { count: 0, .. } => Value::Null,
            Self::Average { count, sum } => {
                let sum = sum
                    .as_f64()
                    .ok_or_else(|| Error::type_mismatch("numeric", sum.type_name()))?;
                Value::Float(sum / count as f64)
            }
            Self::Count(c) | Self::CountRows(c) => Value::Integer(c),
            Self::Max(None) | Self::Min(None) | Self::Sum(None) => Value::Null,
            Self::Max(Some(v)) | Self::Min(Some(v)) | Self::Sum(Some(v)) => v,
        })
    }
}

/// An aggregate call's running state within one partition
#[derive(Debug, Clone)]
pub struct AggregateState {
    accumulator: Accumulator,
    /// Values already seen, for `DISTINCT` aggregates
    seen: Option<HashSet<Value>>,
}

impl AggregateState {
    /// Create the state for an aggregate call expression
    pub fn new(call: &Expr) -> Result<Self> {
        match call {
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                let counts_rows = matches!(args.as_slice(), [Expr::Wildcard]);
                Ok(Self {
                    accumulator: Accumulator::new(name, counts_rows)?,
                    seen: distinct.then(HashSet::new),
                })
            }
            other => Err(Error::ExecutionError(format!(
                "{} is not an aggregate call",
                other
            ))),
        }
    }

    /// Feed one input value
    pub fn add(&mut self, value: Value) -> Result<()> {
        if let Some(seen) = &mut self.seen {
            if value.is_null() || !seen.insert(value.clone()) {
                return Ok(());
            }
        }
        self.accumulator.add(value)
    }

    /// Final value for the partition
    pub fn finish(self) -> Result<Value> {
        self.accumulator.value()
    }
}
