//! Test doubles for the remote store

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use kanban_store::{
    DomainError, DomainResult, Filter, MemoryStore, OrderBy, RemoteStore, Row, Status, Subscription, Table, Task,
};
use kanban_store::repository::ChangeListener;

use crate::context::{BoardContext, ListenerHandle, Notification};
use crate::engine::DragEngine;
use crate::progress::ProgressAggregator;
use crate::store::BoardStore;

pub const PROJECT: &str = "p1";

fn row<T: Serialize>(value: &T) -> Row {
    match serde_json::to_value(value).unwrap() {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

/// Columns New, InProgress, Done and cards T1 in New, T2 in Done
pub async fn seed(store: &dyn RemoteStore) {
    for status in [
        Status::new("new", PROJECT, "New", 0),
        Status::new("doing", PROJECT, "InProgress", 1),
        Status::new("done", PROJECT, "Done", 2),
    ] {
        store.insert(Table::Statuses, row(&status)).await.unwrap();
    }
    insert_task(store, "t1", "new", 1).await;
    insert_task(store, "t2", "done", 2).await;
}

pub async fn insert_task(store: &dyn RemoteStore, id: &str, status_id: &str, created_at: i64) {
    let mut task = Task::new(id, PROJECT, status_id, id.to_uppercase());
    task.created_at = Some(created_at);
    task.updated_at = Some(created_at);
    store.insert(Table::Tasks, row(&task)).await.unwrap();
}

/// Memory store with failure injection and an optional gate on updates
#[derive(Default)]
pub struct TestStore {
    inner: MemoryStore,
    fail_selects: AtomicBool,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
    fail_upserts: AtomicBool,
    gate: Option<Semaphore>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    updates: Mutex<Vec<(String, Row)>>,
    task_select_gate: Mutex<Option<Arc<Semaphore>>>,
    held_selects: AtomicUsize,
    upsert_gate: Mutex<Option<Arc<Semaphore>>>,
    upserts: AtomicUsize,
}

impl TestStore {
    pub async fn seeded() -> Arc<Self> {
        let store = Arc::new(Self::default());
        seed(store.as_ref()).await;
        store
    }

    /// Updates wait until `release` hands out permits
    pub async fn gated() -> Arc<Self> {
        let store = Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        });
        seed(store.as_ref()).await;
        store
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn fail_selects(&self, fail: bool) {
        self.fail_selects.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// Update requests received, including ones still waiting at the gate
    pub fn update_count(&self) -> usize {
        self.updates.lock().len()
    }

    /// `status_id` values sent to `tasks` updates, in order
    pub fn status_updates(&self) -> Vec<(String, String)> {
        self.updates
            .lock()
            .iter()
            .filter_map(|(id, patch)| {
                patch
                    .get("status_id")
                    .and_then(|v| v.as_str())
                    .map(|s| (id.clone(), s.to_string()))
            })
            .collect()
    }

    /// The next `tasks` select reads its rows, then waits for a permit
    pub fn hold_next_task_select(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.task_select_gate.lock() = Some(gate.clone());
        gate
    }

    /// Task selects that were parked by `hold_next_task_select`
    pub fn held_selects(&self) -> usize {
        self.held_selects.load(Ordering::SeqCst)
    }

    /// Upserts wait for permits on the returned semaphore
    pub fn hold_upserts(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.upsert_gate.lock() = Some(gate.clone());
        gate
    }

    /// Upserts that got past the gate, failed ones included
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Mutate directly, bypassing failure injection and the gate
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl RemoteStore for TestStore {
    async fn select(&self, table: Table, filter: &Filter, order_by: Option<&OrderBy>) -> DomainResult<Vec<Row>> {
        if self.fail_selects.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("network unreachable".into()));
        }
        let rows = self.inner.select(table, filter, order_by).await?;
        if table == Table::Tasks {
            let gate = self.task_select_gate.lock().take();
            if let Some(gate) = gate {
                self.held_selects.fetch_add(1, Ordering::SeqCst);
                gate.acquire().await.unwrap().forget();
            }
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Row) -> DomainResult<Row> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("insert rejected".into()));
        }
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: Table, id: &str, patch: Row) -> DomainResult<Row> {
        self.updates.lock().push((id.to_string(), patch.clone()));
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let result = if self.fail_updates.load(Ordering::SeqCst) {
            Err(DomainError::Internal("update rejected".into()))
        } else {
            self.inner.update(table, id, patch).await
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete(&self, table: Table, id: &str) -> DomainResult<Row> {
        self.inner.delete(table, id).await
    }

    async fn upsert(&self, table: Table, row: Row, conflict_key: &str) -> DomainResult<Row> {
        let gate = self.upsert_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        let result = if self.fail_upserts.load(Ordering::SeqCst) {
            Err(DomainError::Internal("progress table locked".into()))
        } else {
            self.inner.upsert(table, row, conflict_key).await
        };
        self.upserts.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn subscribe(&self, table: Table, filter: Filter, on_change: ChangeListener) -> Subscription {
        self.inner.subscribe(table, filter, on_change)
    }
}

/// Yield until `condition` holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Engine wired to `remote` without change-feed sync
pub struct Harness {
    pub context: BoardContext,
    pub board: Arc<BoardStore>,
    pub engine: Arc<DragEngine>,
    pub notifications: Arc<Mutex<Vec<Notification>>>,
    _listener: ListenerHandle,
}

impl Harness {
    pub async fn new(remote: Arc<dyn RemoteStore>) -> Self {
        let context = BoardContext::new();
        let board = Arc::new(BoardStore::new(PROJECT, context.clone()));
        let aggregator = Arc::new(ProgressAggregator::new(remote.clone(), context.clone(), "done"));
        let engine = Arc::new(DragEngine::new(remote.clone(), board.clone(), aggregator, context.clone(), true));

        let notifications = Arc::new(Mutex::new(Vec::new()));
        let sink = notifications.clone();
        let listener = context.on_notification(move |n| sink.lock().push(n.clone()));

        board.load_snapshot(remote.as_ref()).await.unwrap();
        Self {
            context,
            board,
            engine,
            notifications,
            _listener: listener,
        }
    }

    pub fn column_of(&self, card_id: &str) -> Option<String> {
        self.board.snapshot().column_of(card_id).map(str::to_string)
    }

    pub fn error_titles(&self) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.is_error())
            .map(|n| n.title.clone())
            .collect()
    }
}
