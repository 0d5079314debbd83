//! Realtime Sync
//!
//! Change-feed subscriptions for a mounted board. Any column or card change
//! from any client triggers a full reload followed by a progress
//! recomputation; events are never applied as deltas. Bursts of events
//! collapse into a single reload.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use kanban_store::{ChangeEvent, Filter, ProjectProgress, RemoteStore, Subscription, Table};

use crate::commands;
use crate::context::{BoardContext, Notification};
use crate::engine::{DragEngine, MSG_LOAD_FAILED};
use crate::progress::ProgressAggregator;

/// Keeps the board cache in step with remote changes until dropped
pub struct BoardSync {
    subscriptions: Vec<Subscription>,
    worker: JoinHandle<()>,
}

impl BoardSync {
    /// Subscribe to `statuses` and `tasks` of the project and spawn the
    /// reload worker. Must be called inside a tokio runtime.
    pub fn start(
        remote: &dyn RemoteStore,
        project_id: &str,
        engine: Arc<DragEngine>,
        aggregator: Arc<ProgressAggregator>,
        context: BoardContext,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Table>();
        let subscriptions = [Table::Statuses, Table::Tasks]
            .into_iter()
            .map(|table| {
                let tx = tx.clone();
                let subscription = remote.subscribe(
                    table,
                    Filter::eq("project_id", project_id),
                    Box::new(move |event: &ChangeEvent| {
                        // Receiver is gone once the board unmounts
                        let _ = tx.send(event.table);
                    }),
                );
                log::debug!("Subscribed to {}", subscription.channel());
                subscription
            })
            .collect();

        let worker = tokio::spawn(run_worker(rx, engine, aggregator, context));
        Self { subscriptions, worker }
    }
}

impl Drop for BoardSync {
    fn drop(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        self.worker.abort();
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Table>,
    engine: Arc<DragEngine>,
    aggregator: Arc<ProgressAggregator>,
    context: BoardContext,
) {
    while let Some(table) = rx.recv().await {
        let mut coalesced = 0usize;
        while rx.try_recv().is_ok() {
            coalesced += 1;
        }
        log::debug!("Change on {} (+{} more), reloading board", table, coalesced);

        match engine.refresh().await {
            Ok(_) => {
                aggregator.recompute(&engine.settled_snapshot()).await;
            }
            Err(e) => {
                log::error!("{}", e);
                context.notify(Notification::error(MSG_LOAD_FAILED).with_description(e.to_string()));
            }
        }
    }
}

/// Live view of the stored progress row of a project
pub struct ProgressWatch {
    current: Arc<Mutex<Option<ProjectProgress>>>,
    _subscription: Subscription,
}

impl ProgressWatch {
    /// Seed from the store, then follow `project_progress` changes
    pub async fn start(
        remote: &dyn RemoteStore,
        project_id: &str,
        on_update: impl Fn(u8) + Send + Sync + 'static,
    ) -> Self {
        let current: Arc<Mutex<Option<ProjectProgress>>> = Arc::new(Mutex::new(None));
        let on_update = Arc::new(on_update);

        let sink = current.clone();
        let notify = on_update.clone();
        let subscription = remote.subscribe(
            Table::ProjectProgress,
            Filter::eq("project_id", project_id),
            Box::new(move |event: &ChangeEvent| {
                match serde_json::from_value::<ProjectProgress>(serde_json::Value::Object(event.row.clone())) {
                    Ok(record) => {
                        let percentage = record.percentage;
                        *sink.lock() = Some(record);
                        (*notify)(percentage);
                    }
                    Err(e) => log::warn!("Ignoring malformed progress row: {}", e),
                }
            }),
        );

        match commands::get_progress(remote, project_id).await {
            Ok(Some(record)) => {
                let percentage = record.percentage;
                let mut slot = current.lock();
                // A change event may already have delivered a newer row
                if slot.is_none() {
                    *slot = Some(record);
                    drop(slot);
                    (*on_update)(percentage);
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to read progress of {}: {}", project_id, e),
        }

        Self {
            current,
            _subscription: subscription,
        }
    }

    pub fn percentage(&self) -> Option<u8> {
        self.current.lock().as_ref().map(|r| r.percentage)
    }
}
