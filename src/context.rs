//! Board Context
//!
//! Shared observers for one mounted board: progress updates, user-facing
//! notifications and snapshot changes. Consumers register callbacks and
//! keep the returned handle; dropping the handle unregisters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::store::BoardSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient, non-blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: Option<String>,
}

impl Notification {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            description: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Slots<T> = Mutex<Vec<(u64, Callback<T>)>>;

struct Observers<T> {
    next_id: AtomicU64,
    slots: Arc<Slots<T>>,
}

impl<T: 'static> Observers<T> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            slots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn register(&self, callback: Callback<T>) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().push((id, callback));
        let slots: Weak<Slots<T>> = Arc::downgrade(&self.slots);
        ListenerHandle {
            remove: Some(Box::new(move || {
                if let Some(slots) = slots.upgrade() {
                    slots.lock().retain(|(slot, _)| *slot != id);
                }
            })),
        }
    }

    fn emit(&self, value: &T) {
        // Snapshot the callbacks so they can register or drop handles
        let callbacks: Vec<Callback<T>> = self.slots.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            (*callback)(value);
        }
    }

    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Registration handle; unregisters on drop
#[must_use = "dropping the handle unregisters the listener"]
pub struct ListenerHandle {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerHandle {
    /// Keep the listener registered for the lifetime of the context
    pub fn forget(mut self) {
        self.remove = None;
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

struct ContextInner {
    progress: Observers<u8>,
    notifications: Observers<Notification>,
    snapshots: Observers<BoardSnapshot>,
    last_progress: Mutex<Option<u8>>,
}

/// App-wide observers, cheap to clone
#[derive(Clone)]
pub struct BoardContext {
    inner: Arc<ContextInner>,
}

impl Default for BoardContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                progress: Observers::new(),
                notifications: Observers::new(),
                snapshots: Observers::new(),
                last_progress: Mutex::new(None),
            }),
        }
    }

    /// Called with the percentage every time progress is recomputed
    pub fn on_progress_update(&self, callback: impl Fn(u8) + Send + Sync + 'static) -> ListenerHandle {
        self.inner.progress.register(Arc::new(move |pct: &u8| callback(*pct)))
    }

    pub fn on_notification(&self, callback: impl Fn(&Notification) + Send + Sync + 'static) -> ListenerHandle {
        self.inner.notifications.register(Arc::new(callback))
    }

    /// Called after every snapshot swap in the board cache
    pub fn on_snapshot(&self, callback: impl Fn(&BoardSnapshot) + Send + Sync + 'static) -> ListenerHandle {
        self.inner.snapshots.register(Arc::new(callback))
    }

    /// Last percentage published, if any
    pub fn progress(&self) -> Option<u8> {
        *self.inner.last_progress.lock()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.progress.len() + self.inner.notifications.len() + self.inner.snapshots.len()
    }

    pub(crate) fn publish_progress(&self, percentage: u8) {
        *self.inner.last_progress.lock() = Some(percentage);
        self.inner.progress.emit(&percentage);
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.inner.notifications.emit(&notification);
    }

    pub(crate) fn publish_snapshot(&self, snapshot: &BoardSnapshot) {
        self.inner.snapshots.emit(snapshot);
    }
}
