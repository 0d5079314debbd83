//! Change Feed
//!
//! Row-level change notifications. Stores publish after every successful
//! mutation; listeners registered with a table and filter are invoked for
//! each matching event, in publish order, on the publishing task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::table::{Filter, Row, Table};
use super::traits::ChangeListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row mutation. Deletes carry the removed row.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row: Row,
}

struct Registration {
    table: Table,
    filter: Filter,
    listener: Arc<ChangeListener>,
}

#[derive(Default)]
struct FeedInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Registration>>,
}

/// Shared publish/subscribe hub
#[derive(Clone, Default)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, table: Table, filter: Filter, listener: ChangeListener) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let channel = filter.channel_name(table);
        log::debug!("Setting up subscription {} ({})", channel, id);
        self.inner.listeners.lock().insert(
            id,
            Registration {
                table,
                filter,
                listener: Arc::new(listener),
            },
        );
        Subscription {
            feed: Arc::downgrade(&self.inner),
            id,
            channel,
        }
    }

    /// Deliver an event to every matching listener
    pub fn publish(&self, event: ChangeEvent) {
        // Listeners may subscribe or unsubscribe while being called
        let targets: Vec<Arc<ChangeListener>> = {
            let listeners = self.inner.listeners.lock();
            let mut ids: Vec<&u64> = listeners
                .iter()
                .filter(|(_, reg)| reg.table == event.table && reg.filter.matches(&event.row))
                .map(|(id, _)| id)
                .collect();
            ids.sort();
            ids.into_iter().map(|id| listeners[id].listener.clone()).collect()
        };
        for listener in targets {
            (**listener)(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

/// Subscription handle; unsubscribes on drop
pub struct Subscription {
    feed: Weak<FeedInner>,
    id: u64,
    channel: String,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.feed.upgrade() {
            inner.listeners.lock().remove(&self.id);
            log::debug!("Cleaning up subscription {}", self.channel);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("channel", &self.channel).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn task_event(project: &str) -> ChangeEvent {
        ChangeEvent {
            table: Table::Tasks,
            kind: ChangeKind::Update,
            row: json!({"id": "t1", "project_id": project}).as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_publish_respects_table_and_filter() {
        let feed = ChangeFeed::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _sub = feed.subscribe(
            Table::Tasks,
            Filter::eq("project_id", "p1"),
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        feed.publish(task_event("p1"));
        feed.publish(task_event("p2"));
        feed.publish(ChangeEvent { table: Table::Statuses, ..task_event("p1") });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let feed = ChangeFeed::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let sub = feed.subscribe(
            Table::Tasks,
            Filter::All,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(sub.channel(), "tasks_all");
        assert_eq!(feed.subscriber_count(), 1);

        sub.unsubscribe();
        feed.publish(task_event("p1"));

        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
