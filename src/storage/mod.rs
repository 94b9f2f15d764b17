//! Storage module
//!
//! In-memory row storage:
//! - Values and tuples
//! - Tables (definition plus rows)
//! - Date literal parsing

pub mod date;
pub mod table;
pub mod tuple;

pub use table::Table;
pub use tuple::{Tuple, Value};
