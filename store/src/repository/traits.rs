//! Repository Layer - Core Traits
//!
//! Defines the abstract interface of the remote store.
//! Implementations can use SQLite, in-memory, a hosted backend, etc.

use async_trait::async_trait;

use super::change_feed::{ChangeEvent, Subscription};
use super::table::{Filter, OrderBy, Row, Table};
use crate::domain::DomainResult;

/// Callback invoked for every change event matching a subscription
pub type ChangeListener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Queryable, mutable collection of typed rows with a change feed
///
/// Every mutation that succeeds is published to subscribers whose
/// table and filter match the affected row.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read rows matching `filter`, optionally ordered by one column
    async fn select(&self, table: Table, filter: &Filter, order_by: Option<&OrderBy>) -> DomainResult<Vec<Row>>;

    /// Insert a row, assigning an id when none is given
    async fn insert(&self, table: Table, row: Row) -> DomainResult<Row>;

    /// Merge `patch` into the row with `id`
    async fn update(&self, table: Table, id: &str, patch: Row) -> DomainResult<Row>;

    /// Delete the row with `id`, returning it
    async fn delete(&self, table: Table, id: &str) -> DomainResult<Row>;

    /// Create or replace the row whose `conflict_key` column matches
    async fn upsert(&self, table: Table, row: Row, conflict_key: &str) -> DomainResult<Row>;

    /// Register for change events; dropping the handle unsubscribes
    fn subscribe(&self, table: Table, filter: Filter, on_change: ChangeListener) -> Subscription;
}
