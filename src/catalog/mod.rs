//! Catalog module
//!
//! This module contains the in-memory catalog, schema definitions, and data types.

pub mod catalog;
pub mod schema;
pub mod seed;
pub mod types;

pub use catalog::{AlterAction, Catalog, TableBuilder};
pub use schema::{Column, Schema, TableDef};
pub use types::DataType;
