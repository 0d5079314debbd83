//! Task Entity
//!
//! A card on the board. `status_id` is the column the card currently sits in
//! and is the only field a drag changes.

use serde::{Deserialize, Serialize};
use super::entity::DomainError;

/// Task priority (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    Must,
    #[default]
    Medium,
    Tiny,
    Huge,
}

impl std::str::FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Must" => Ok(Priority::Must),
            "Medium" => Ok(Priority::Medium),
            "Tiny" => Ok(Priority::Tiny),
            "Huge" => Ok(Priority::Huge),
            other => Err(DomainError::InvalidInput(format!("unknown priority '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    /// Column the card belongs to
    pub status_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    /// Creation time in epoch millis
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        status_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            status_id: status_id.into(),
            title: title.into(),
            description: None,
            priority: Priority::default(),
            assigned_to: None,
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("t1", "p1", "s1", "Write docs").with_priority(Priority::Huge);
        assert_eq!(task.id, "t1");
        assert_eq!(task.status_id, "s1");
        assert_eq!(task.priority, Priority::Huge);
        assert!(task.description.is_none());
    }

    #[test]
    fn test_priority_round_trip_names() {
        assert_eq!("Tiny".parse::<Priority>().unwrap(), Priority::Tiny);
        assert!("tiny".parse::<Priority>().is_err());
        assert_eq!(serde_json::to_value(Priority::Must).unwrap(), "Must");
    }

    #[test]
    fn test_task_deserializes_with_missing_optionals() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "project_id": "p1",
            "status_id": "s1",
            "title": "Sparse row",
            "priority": "Must"
        }))
        .unwrap();
        assert_eq!(task.priority, Priority::Must);
        assert!(task.created_at.is_none());
    }
}
