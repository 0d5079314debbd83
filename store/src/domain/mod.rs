//! Domain Layer
//!
//! Contains the board entities and core abstractions.
//! This layer has NO storage dependencies (only serde and chrono).

mod entity;
mod status;
mod task;
mod progress;

pub use entity::{DomainError, DomainResult};
pub use status::{Status, DONE_STATUS_NAME};
pub use task::{Priority, Task};
pub use progress::ProjectProgress;
