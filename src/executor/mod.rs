//! Query execution module
//!
//! This module contains the query planner, expression evaluation, aggregate
//! accumulators and the executor.

pub mod aggregate;
pub mod eval;
pub mod executor;
pub mod planner;

pub use executor::{ExecutionEngine, QueryResult};
pub use planner::{LogicalPlan, Planner};
