//! In-Memory Store
//!
//! Tables held as insertion-ordered row vectors. Used by tests and by
//! clients that run without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::change_feed::{ChangeEvent, ChangeFeed, ChangeKind, Subscription};
use super::table::{ensure_id, Filter, OrderBy, Row, Table};
use super::traits::{ChangeListener, RemoteStore};
use crate::domain::{DomainError, DomainResult};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn not_found(table: Table, id: &str) -> DomainError {
        DomainError::NotFound(format!("{} row {}", table, id))
    }
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(|v| v.as_str())
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, table: Table, filter: &Filter, order_by: Option<&OrderBy>) -> DomainResult<Vec<Row>> {
        if let Some(order) = order_by {
            table.check_column(&order.column)?;
        }
        let tables = self.tables.lock().await;
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();
        if let Some(order) = order_by {
            // Stable: ties keep insertion order
            rows.sort_by(|a, b| order.compare(a, b));
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut row: Row) -> DomainResult<Row> {
        table.check_row(&row)?;
        let id = ensure_id(&mut row)?;
        {
            let mut tables = self.tables.lock().await;
            let rows = tables.entry(table).or_default();
            if rows.iter().any(|r| row_id(r) == Some(id.as_str())) {
                return Err(DomainError::Conflict(format!("{} row {} already exists", table, id)));
            }
            rows.push(row.clone());
        }
        self.feed.publish(ChangeEvent { table, kind: ChangeKind::Insert, row: row.clone() });
        Ok(row)
    }

    async fn update(&self, table: Table, id: &str, mut patch: Row) -> DomainResult<Row> {
        table.check_row(&patch)?;
        patch.remove("id");
        let updated = {
            let mut tables = self.tables.lock().await;
            let row = tables
                .get_mut(&table)
                .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
                .ok_or_else(|| Self::not_found(table, id))?;
            row.extend(patch);
            row.clone()
        };
        self.feed.publish(ChangeEvent { table, kind: ChangeKind::Update, row: updated.clone() });
        Ok(updated)
    }

    async fn delete(&self, table: Table, id: &str) -> DomainResult<Row> {
        let removed = {
            let mut tables = self.tables.lock().await;
            let rows = tables.get_mut(&table).ok_or_else(|| Self::not_found(table, id))?;
            let index = rows
                .iter()
                .position(|r| row_id(r) == Some(id))
                .ok_or_else(|| Self::not_found(table, id))?;
            rows.remove(index)
        };
        self.feed.publish(ChangeEvent { table, kind: ChangeKind::Delete, row: removed.clone() });
        Ok(removed)
    }

    async fn upsert(&self, table: Table, mut row: Row, conflict_key: &str) -> DomainResult<Row> {
        table.check_row(&row)?;
        table.check_column(conflict_key)?;
        let key = row
            .get(conflict_key)
            .cloned()
            .ok_or_else(|| DomainError::InvalidInput(format!("upsert row is missing '{}'", conflict_key)))?;

        let (kind, stored) = {
            let mut tables = self.tables.lock().await;
            let rows = tables.entry(table).or_default();
            match rows.iter_mut().find(|r| r.get(conflict_key) == Some(&key)) {
                Some(existing) => {
                    row.remove("id");
                    existing.extend(row);
                    (ChangeKind::Update, existing.clone())
                }
                None => {
                    let id = ensure_id(&mut row)?;
                    if rows.iter().any(|r| row_id(r) == Some(id.as_str())) {
                        return Err(DomainError::Conflict(format!("{} row {} already exists", table, id)));
                    }
                    rows.push(row.clone());
                    (ChangeKind::Insert, row)
                }
            }
        };
        self.feed.publish(ChangeEvent { table, kind, row: stored.clone() });
        Ok(stored)
    }

    fn subscribe(&self, table: Table, filter: Filter, on_change: ChangeListener) -> Subscription {
        self.feed.subscribe(table, filter, on_change)
    }
}
