//! Progress Aggregator
//!
//! Derives the completion percentage of a project from a board snapshot and
//! persists it. Persisting is best-effort: failures are logged and dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kanban_store::{ProjectProgress, RemoteStore};

use crate::commands;
use crate::context::BoardContext;
use crate::error::ProgressWriteError;
use crate::store::BoardSnapshot;

/// Share of cards in the done column, rounded half up.
///
/// Zero when the snapshot has no cards or no column named `done_name`.
pub fn completion_percentage(snapshot: &BoardSnapshot, done_name: &str) -> u8 {
    let total = snapshot.cards().len();
    let Some(done) = snapshot.done_column(done_name) else {
        return 0;
    };
    if total == 0 {
        return 0;
    }
    let completed = snapshot.cards_in_column(&done.id).len();
    ((completed * 100 + total / 2) / total) as u8
}

pub struct ProgressAggregator {
    remote: Arc<dyn RemoteStore>,
    context: BoardContext,
    done_column_name: String,
    /// Sequence of the last published value
    published: AtomicU64,
    writes: tokio::sync::Mutex<()>,
}

impl ProgressAggregator {
    pub fn new(remote: Arc<dyn RemoteStore>, context: BoardContext, done_column_name: impl Into<String>) -> Self {
        Self {
            remote,
            context,
            done_column_name: done_column_name.into(),
            published: AtomicU64::new(0),
            writes: tokio::sync::Mutex::new(()),
        }
    }

    /// Recompute, publish to observers, then upsert the progress row
    pub async fn recompute(&self, snapshot: &BoardSnapshot) -> u8 {
        let (percentage, sequence) = self.publish(snapshot);
        self.write(snapshot.project_id(), percentage, sequence).await;
        percentage
    }

    /// Publish now and upsert on a background task
    pub fn recompute_detached(self: &Arc<Self>, snapshot: &BoardSnapshot) -> u8 {
        let (percentage, sequence) = self.publish(snapshot);
        let aggregator = Arc::clone(self);
        let project_id = snapshot.project_id().to_string();
        tokio::spawn(async move {
            aggregator.write(&project_id, percentage, sequence).await;
        });
        percentage
    }

    fn publish(&self, snapshot: &BoardSnapshot) -> (u8, u64) {
        let percentage = completion_percentage(snapshot, &self.done_column_name);
        let sequence = self.published.fetch_add(1, Ordering::SeqCst) + 1;
        self.context.publish_progress(percentage);
        (percentage, sequence)
    }

    /// Writes run one at a time; a value superseded before its turn is skipped
    async fn write(&self, project_id: &str, percentage: u8, sequence: u64) {
        let _turn = self.writes.lock().await;
        if sequence < self.published.load(Ordering::SeqCst) {
            log::debug!("Skipping superseded progress {}% of {}", percentage, project_id);
            return;
        }
        if let Err(e) = self.persist(project_id, percentage).await {
            log::warn!("{}", e);
        }
    }

    async fn persist(&self, project_id: &str, percentage: u8) -> Result<ProjectProgress, ProgressWriteError> {
        let record = ProjectProgress::now(project_id, percentage);
        let stored = commands::upsert_progress(self.remote.as_ref(), &record).await?;
        log::debug!("Progress of {} is {}%", project_id, stored.percentage);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_store::{MemoryStore, Status, Task};

    fn snapshot(done_cards: usize, other_cards: usize) -> BoardSnapshot {
        let mut cards = Vec::new();
        for i in 0..done_cards {
            cards.push(Task::new(format!("d{}", i), "p1", "done", "x"));
        }
        for i in 0..other_cards {
            cards.push(Task::new(format!("o{}", i), "p1", "new", "x"));
        }
        BoardSnapshot::new(
            "p1",
            vec![Status::new("new", "p1", "New", 0), Status::new("done", "p1", "Done", 1)],
            cards,
        )
    }

    #[test]
    fn test_no_done_column_is_zero() {
        let snapshot = BoardSnapshot::new(
            "p1",
            vec![Status::new("new", "p1", "New", 0)],
            vec![Task::new("t1", "p1", "new", "x")],
        );
        assert_eq!(completion_percentage(&snapshot, "done"), 0);
    }

    #[test]
    fn test_no_cards_is_zero() {
        assert_eq!(completion_percentage(&snapshot(0, 0), "done"), 0);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(completion_percentage(&snapshot(1, 3), "done"), 25);
        assert_eq!(completion_percentage(&snapshot(1, 2), "done"), 33);
        assert_eq!(completion_percentage(&snapshot(2, 1), "done"), 67);
        assert_eq!(completion_percentage(&snapshot(1, 7), "done"), 13);
        assert_eq!(completion_percentage(&snapshot(2, 0), "done"), 100);
    }

    #[test]
    fn test_configured_done_name() {
        let snapshot = BoardSnapshot::new(
            "p1",
            vec![Status::new("s", "p1", "Shipped", 0)],
            vec![Task::new("t1", "p1", "s", "x")],
        );
        assert_eq!(completion_percentage(&snapshot, "shipped"), 100);
        assert_eq!(completion_percentage(&snapshot, "done"), 0);
    }

    #[tokio::test]
    async fn test_recompute_upserts_one_row() {
        let remote = Arc::new(MemoryStore::new());
        let context = BoardContext::new();
        let aggregator = ProgressAggregator::new(remote.clone(), context.clone(), "done");

        assert_eq!(aggregator.recompute(&snapshot(1, 3)).await, 25);
        assert_eq!(aggregator.recompute(&snapshot(1, 1)).await, 50);

        let stored = commands::get_progress(remote.as_ref(), "p1").await.unwrap().unwrap();
        assert_eq!(stored.percentage, 50);
        let rows = remote
            .select(kanban_store::Table::ProjectProgress, &kanban_store::Filter::All, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(context.progress(), Some(50));
    }
}
