//! Store Command Wrappers
//!
//! Typed bindings to remote store queries, organized by table.

mod status;
mod task;
mod progress;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use kanban_store::{DomainError, DomainResult, Row};

// Re-export all public items
pub use status::*;
pub use task::*;
pub use progress::*;

/// Decode a stored row into a typed record
fn from_row<T: DeserializeOwned>(row: Row) -> DomainResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(DomainError::from)
}

/// Encode an argument struct into a row
fn to_row<T: Serialize>(args: &T) -> DomainResult<Row> {
    match serde_json::to_value(args)? {
        Value::Object(row) => Ok(row),
        other => Err(DomainError::InvalidInput(format!("expected an object, got {}", other))),
    }
}

fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> DomainResult<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}
