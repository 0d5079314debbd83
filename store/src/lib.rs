//! Kanban Store
//!
//! Layered architecture:
//! - domain: Board entities and domain errors
//! - repository: The remote store contract, its change feed and backends

pub mod domain;
pub mod repository;

pub use domain::{DomainError, DomainResult, Priority, ProjectProgress, Status, Task, DONE_STATUS_NAME};
pub use repository::{
    ChangeEvent, ChangeFeed, ChangeKind, Filter, MemoryStore, OrderBy, RemoteStore, Row, SqliteStore,
    Subscription, Table,
};
