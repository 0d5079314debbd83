//! Board configuration
//!
//! Read from a JSON file; every field has a default so partial files work.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Pointer travel before a press becomes a drag
    pub activation_distance_px: f64,
    /// Column whose cards count as completed (case-insensitive)
    pub done_column_name: String,
    /// Emit success notifications, not only failures
    pub notify_on_success: bool,
    pub log_level: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            activation_distance_px: board_dragdrop::DEFAULT_ACTIVATION_DISTANCE_PX,
            done_column_name: kanban_store::domain::DONE_STATUS_NAME.to_string(),
            notify_on_success: true,
            log_level: "info".to_string(),
        }
    }
}

impl BoardConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
