//! Tables, rows and query predicates shared by every store backend.

use std::cmp::Ordering;

use serde_json::Value;

use crate::domain::{DomainError, DomainResult};

/// A stored record: column name to JSON value
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Statuses,
    Tasks,
    ProjectProgress,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Statuses => "statuses",
            Table::Tasks => "tasks",
            Table::ProjectProgress => "project_progress",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Statuses => &["id", "project_id", "name", "display_order"],
            Table::Tasks => &[
                "id",
                "project_id",
                "status_id",
                "title",
                "description",
                "priority",
                "assigned_to",
                "created_by",
                "created_at",
                "updated_at",
            ],
            Table::ProjectProgress => &["id", "project_id", "percentage", "calculated_at"],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Reject rows carrying columns the table does not define
    pub fn check_row(&self, row: &Row) -> DomainResult<()> {
        match row.keys().find(|key| !self.has_column(key)) {
            Some(key) => Err(DomainError::InvalidInput(format!(
                "unknown column '{}' for table {}",
                key,
                self.as_str()
            ))),
            None => Ok(()),
        }
    }

    pub fn check_column(&self, column: &str) -> DomainResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DomainError::InvalidInput(format!(
                "unknown column '{}' for table {}",
                column,
                self.as_str()
            )))
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row predicate for reads and subscriptions
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq { column: String, value: Value },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { column, value } => row.get(column) == Some(value),
        }
    }

    /// Subscription channel name, e.g. `tasks_<project id>`
    pub fn channel_name(&self, table: Table) -> String {
        match self {
            Filter::All => format!("{}_all", table),
            Filter::Eq { value: Value::String(s), .. } => format!("{}_{}", table, s),
            Filter::Eq { value, .. } => format!("{}_{}", table, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: true }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: false }
    }

    /// Compare two rows on the ordering column (nulls first when ascending)
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let ord = compare_values(a.get(&self.column), b.get(&self.column));
        if self.ascending { ord } else { ord.reverse() }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = |v: Option<&Value>| match v {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(_) => 4,
    };
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Assign a fresh UUID when the row has no usable id
pub(crate) fn ensure_id(row: &mut Row) -> DomainResult<String> {
    match row.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        None | Some(Value::Null) => {
            let id = uuid::Uuid::new_v4().to_string();
            row.insert("id".to_string(), Value::String(id.clone()));
            Ok(id)
        }
        Some(other) => Err(DomainError::InvalidInput(format!("id must be a string, got {}", other))),
    }
}
