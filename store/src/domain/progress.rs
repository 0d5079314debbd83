//! Project Progress Record
//!
//! One row per project, upserted by `project_id`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProgress {
    pub project_id: String,
    /// Completion percentage, 0..=100
    pub percentage: u8,
    /// Calculation time in epoch millis
    pub calculated_at: i64,
}

impl ProjectProgress {
    /// Build a record stamped with the current time
    pub fn now(project_id: impl Into<String>, percentage: u8) -> Self {
        Self {
            project_id: project_id.into(),
            percentage: percentage.min(100),
            calculated_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn calculated_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.calculated_at).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(ProjectProgress::now("p1", 250).percentage, 100);
    }

    #[test]
    fn test_timestamp_converts() {
        let record = ProjectProgress {
            project_id: "p1".to_string(),
            percentage: 50,
            calculated_at: 0,
        };
        assert_eq!(record.calculated_at_utc().unwrap().timestamp(), 0);
    }
}
