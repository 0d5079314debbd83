//! Status Entity
//!
//! A board column. Statuses are created when a project is initialised and
//! are rendered left to right by `display_order`.

use serde::{Deserialize, Serialize};

/// Reserved column name that marks completed work
pub const DONE_STATUS_NAME: &str = "done";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub display_order: i32,
}

impl Status {
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, name: impl Into<String>, display_order: i32) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            name: name.into(),
            display_order,
        }
    }

    /// Case-insensitive comparison against a column name
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
