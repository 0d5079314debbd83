//! Board State Store
//!
//! Holds the columns and cards of one project as an immutable snapshot.
//! Every change swaps in a new `Arc<BoardSnapshot>`; readers keep whatever
//! snapshot they cloned and never see a half-applied update.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use kanban_store::{RemoteStore, Status, Table, Task};

use crate::commands;
use crate::context::BoardContext;
use crate::error::FetchError;

/// Point-in-time view of all columns and cards of a project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    project_id: String,
    columns: Vec<Status>,
    cards: Vec<Task>,
}

impl BoardSnapshot {
    /// Columns are ordered by `display_order` (ties keep arrival order).
    /// Cards whose column is not part of the snapshot are dropped.
    pub fn new(project_id: impl Into<String>, mut columns: Vec<Status>, cards: Vec<Task>) -> Self {
        columns.sort_by_key(|c| c.display_order);
        let (cards, dangling): (Vec<Task>, Vec<Task>) = cards
            .into_iter()
            .partition(|card| columns.iter().any(|c| c.id == card.status_id));
        for card in &dangling {
            log::warn!("Dropping task {} from board: unknown column {}", card.id, card.status_id);
        }
        Self {
            project_id: project_id.into(),
            columns,
            cards,
        }
    }

    pub fn empty(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn columns(&self) -> &[Status] {
        &self.columns
    }

    pub fn cards(&self) -> &[Task] {
        &self.cards
    }

    pub fn card(&self, card_id: &str) -> Option<&Task> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    pub fn column(&self, column_id: &str) -> Option<&Status> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn has_column(&self, column_id: &str) -> bool {
        self.column(column_id).is_some()
    }

    /// Column a card currently sits in
    pub fn column_of(&self, card_id: &str) -> Option<&str> {
        self.card(card_id).map(|c| c.status_id.as_str())
    }

    /// Cards of one column in arrival order
    pub fn cards_in_column(&self, column_id: &str) -> Vec<&Task> {
        self.cards.iter().filter(|c| c.status_id == column_id).collect()
    }

    /// First column (left to right) carrying `name`, case-insensitively
    pub fn done_column(&self, name: &str) -> Option<&Status> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    /// Every card references a column of this snapshot
    pub fn is_consistent(&self) -> bool {
        self.cards.iter().all(|card| self.has_column(&card.status_id))
    }

    /// New snapshot with `card_id` moved to `target_column_id`.
    ///
    /// Unknown cards and unknown columns leave the snapshot unchanged.
    pub fn relocate(&self, card_id: &str, target_column_id: &str) -> BoardSnapshot {
        if self.card(card_id).is_none() || !self.has_column(target_column_id) {
            return self.clone();
        }
        let cards = self
            .cards
            .iter()
            .map(|card| {
                if card.id == card_id {
                    Task {
                        status_id: target_column_id.to_string(),
                        ..card.clone()
                    }
                } else {
                    card.clone()
                }
            })
            .collect();
        BoardSnapshot {
            project_id: self.project_id.clone(),
            columns: self.columns.clone(),
            cards,
        }
    }
}

/// Cache of the current snapshot for one mounted board
pub struct BoardStore {
    project_id: String,
    current: RwLock<Arc<BoardSnapshot>>,
    context: BoardContext,
    /// Generation of the last load started
    loads_started: AtomicU64,
    /// Generation of the last load swapped in
    loads_applied: AtomicU64,
}

impl BoardStore {
    pub fn new(project_id: impl Into<String>, context: BoardContext) -> Self {
        let project_id = project_id.into();
        Self {
            current: RwLock::new(Arc::new(BoardSnapshot::empty(project_id.clone()))),
            project_id,
            context,
            loads_started: AtomicU64::new(0),
            loads_applied: AtomicU64::new(0),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn snapshot(&self) -> Arc<BoardSnapshot> {
        self.current.read().clone()
    }

    /// Fetch columns then cards and swap them in.
    ///
    /// On failure the previous snapshot stays in place. A superseded load
    /// returns the snapshot already in place.
    pub async fn load_snapshot(&self, remote: &dyn RemoteStore) -> Result<Arc<BoardSnapshot>, FetchError> {
        Ok(match self.load(remote).await? {
            Some(loaded) => loaded,
            None => self.snapshot(),
        })
    }

    /// Like `load_snapshot`, but `None` when a later-started load was
    /// applied first and this result was discarded
    pub async fn load(&self, remote: &dyn RemoteStore) -> Result<Option<Arc<BoardSnapshot>>, FetchError> {
        let generation = self.loads_started.fetch_add(1, Ordering::SeqCst) + 1;
        let columns = commands::list_statuses(remote, &self.project_id)
            .await
            .map_err(|source| FetchError { table: Table::Statuses, source })?;
        let cards = commands::list_tasks(remote, &self.project_id)
            .await
            .map_err(|source| FetchError { table: Table::Tasks, source })?;

        log::debug!(
            "Loaded board {}: {} columns, {} cards",
            self.project_id,
            columns.len(),
            cards.len()
        );
        let snapshot = BoardSnapshot::new(self.project_id.clone(), columns, cards);

        let next = {
            let mut current = self.current.write();
            if generation < self.loads_applied.load(Ordering::SeqCst) {
                log::debug!("Discarding stale load {} of board {}", generation, self.project_id);
                return Ok(None);
            }
            self.loads_applied.store(generation, Ordering::SeqCst);
            let next = Arc::new(snapshot);
            *current = next.clone();
            next
        };
        self.context.publish_snapshot(&next);
        Ok(Some(next))
    }

    /// Speculatively move a card; no I/O
    pub fn relocate(&self, card_id: &str, target_column_id: &str) -> Arc<BoardSnapshot> {
        let next = {
            let mut current = self.current.write();
            if current.column_of(card_id) == Some(target_column_id) {
                return current.clone();
            }
            let next = Arc::new(current.relocate(card_id, target_column_id));
            *current = next.clone();
            next
        };
        self.context.publish_snapshot(&next);
        next
    }

    /// Swap in a whole snapshot
    pub fn replace(&self, snapshot: BoardSnapshot) -> Arc<BoardSnapshot> {
        let next = Arc::new(snapshot);
        *self.current.write() = next.clone();
        self.context.publish_snapshot(&next);
        next
    }

    /// Owned copy of one column's cards, for rendering
    pub fn cards_in_column(&self, column_id: &str) -> Vec<Task> {
        self.snapshot().cards_in_column(column_id).into_iter().cloned().collect()
    }
}
