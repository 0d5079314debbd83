//! Repository Layer
//!
//! The remote store contract and its implementations.

mod traits;
mod table;
mod change_feed;
mod memory_store;
mod db;
mod sqlite_store;

#[cfg(test)]
mod tests;

pub use traits::{RemoteStore, ChangeListener};
pub use table::{Table, Filter, OrderBy, Row};
pub use change_feed::{ChangeFeed, ChangeEvent, ChangeKind, Subscription};
pub use memory_store::MemoryStore;
pub use db::open_connection;
pub use sqlite_store::SqliteStore;
