//! Kanban Board Core
//!
//! Client-side state for a project board: a snapshot cache of columns and
//! cards, an optimistic drag-and-drop engine that reconciles with the remote
//! store, and a progress aggregator kept fresh by the change feed.

pub mod board;
pub mod commands;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod progress;
pub mod realtime;
pub mod store;

#[cfg(test)]
mod test_support;

pub use board::Board;
pub use config::{BoardConfig, ConfigError};
pub use context::{BoardContext, ListenerHandle, Notification, NotificationLevel};
pub use engine::{DragEngine, DragOutcome, DragPhase, DragSession};
pub use error::{BoardError, BoardResult, CommitError, FetchError, ProgressWriteError};
pub use progress::{completion_percentage, ProgressAggregator};
pub use realtime::{BoardSync, ProgressWatch};
pub use store::{BoardSnapshot, BoardStore};
