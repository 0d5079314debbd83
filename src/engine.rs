//! Drag Reconciliation Engine
//!
//! Turns a drag gesture into one authoritative `status_id` update.
//!
//! ```text
//! Idle --start--> Dragging --over--> Dragging (speculative relocate)
//!                    |  \--cancel / drop on nothing--> Idle (local rollback)
//!                    \--drop--> Committing --ok--> Idle (+ progress)
//!                                          \--err--> Idle (full reload)
//! ```
//!
//! One commit per card is in flight at a time. A drop on a card whose commit
//! has not resolved yet is coalesced: the latest column is committed after
//! the running request finishes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use kanban_store::RemoteStore;

use crate::commands;
use crate::context::{BoardContext, Notification};
use crate::error::{CommitError, FetchError};
use crate::progress::ProgressAggregator;
use crate::store::{BoardSnapshot, BoardStore};

pub const MSG_STATUS_UPDATED: &str = "Task status updated";
pub const MSG_STATUS_FAILED: &str = "Failed to update task status";
pub const MSG_LOAD_FAILED: &str = "Failed to load board data";

/// Ephemeral state between drag start and drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub card_id: String,
    /// Column before the drag, used for local rollback
    pub origin_column_id: String,
    pub target_column_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Gesture {
    Idle,
    Dragging(DragSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    /// No drag active but at least one commit has not resolved
    Committing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Event did not belong to the active session
    Ignored,
    Cancelled { card_id: String, restored_column_id: String },
    Committed { card_id: String, column_id: String },
    /// Folded into the commit already running for this card
    Coalesced { card_id: String, column_id: String },
    Failed { card_id: String, error: CommitError },
}

/// In-flight commit of one card
#[derive(Debug, Clone)]
struct CommitSlot {
    column_id: String,
    pending: Option<String>,
}

impl CommitSlot {
    fn wanted(&self) -> &str {
        self.pending.as_deref().unwrap_or(&self.column_id)
    }
}

pub struct DragEngine {
    remote: Arc<dyn RemoteStore>,
    board: Arc<BoardStore>,
    aggregator: Arc<ProgressAggregator>,
    context: BoardContext,
    notify_on_success: bool,
    gesture: Mutex<Gesture>,
    commits: Mutex<HashMap<String, CommitSlot>>,
}

impl DragEngine {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        board: Arc<BoardStore>,
        aggregator: Arc<ProgressAggregator>,
        context: BoardContext,
        notify_on_success: bool,
    ) -> Self {
        Self {
            remote,
            board,
            aggregator,
            context,
            notify_on_success,
            gesture: Mutex::new(Gesture::Idle),
            commits: Mutex::new(HashMap::new()),
        }
    }

    pub fn phase(&self) -> DragPhase {
        if matches!(*self.gesture.lock(), Gesture::Dragging(_)) {
            DragPhase::Dragging
        } else if !self.commits.lock().is_empty() {
            DragPhase::Committing
        } else {
            DragPhase::Idle
        }
    }

    pub fn session(&self) -> Option<DragSession> {
        match &*self.gesture.lock() {
            Gesture::Dragging(session) => Some(session.clone()),
            Gesture::Idle => None,
        }
    }

    /// Current cache with the active drag's speculative move undone
    pub fn settled_snapshot(&self) -> BoardSnapshot {
        let current = self.board.snapshot();
        match self.session() {
            Some(session) => current.relocate(&session.card_id, &session.origin_column_id),
            None => (*current).clone(),
        }
    }

    pub fn is_committing(&self, card_id: &str) -> bool {
        self.commits.lock().contains_key(card_id)
    }

    /// Begin a drag on a card. Returns false when ignored.
    pub fn on_drag_start(&self, item_id: &str) -> bool {
        let snapshot = self.board.snapshot();
        let mut gesture = self.gesture.lock();
        if let Gesture::Dragging(session) = &*gesture {
            log::debug!("Drag of {} ignored: {} is being dragged", item_id, session.card_id);
            return false;
        }
        let Some(card) = snapshot.card(item_id) else {
            if snapshot.has_column(item_id) {
                log::debug!("Column drag of {} ignored", item_id);
            } else {
                log::debug!("Drag of unknown item {} ignored", item_id);
            }
            return false;
        };
        *gesture = Gesture::Dragging(DragSession {
            card_id: card.id.clone(),
            origin_column_id: card.status_id.clone(),
            target_column_id: card.status_id.clone(),
        });
        true
    }

    /// Pointer over a column or a card: move the dragged card there speculatively
    pub fn on_drag_over(&self, item_id: &str, target_id: &str) -> bool {
        let Some(column_id) = resolve_target(&self.board.snapshot(), target_id) else {
            return false;
        };
        {
            let mut gesture = self.gesture.lock();
            match &mut *gesture {
                Gesture::Dragging(session) if session.card_id == item_id => {
                    session.target_column_id = column_id.clone();
                }
                _ => return false,
            }
        }
        self.board.relocate(item_id, &column_id);
        true
    }

    /// Abort the active drag and restore the card's original column
    pub fn on_drag_cancel(&self, item_id: &str) -> DragOutcome {
        match self.take_session(item_id) {
            Some(session) => self.rollback(session),
            None => DragOutcome::Ignored,
        }
    }

    /// Drop. A missing or unknown target cancels; otherwise the card's
    /// current column is committed to the store.
    pub async fn on_drag_end(&self, item_id: &str, target_id: Option<&str>) -> DragOutcome {
        let Some(session) = self.take_session(item_id) else {
            return DragOutcome::Ignored;
        };
        let snapshot = self.board.snapshot();
        let Some(target) = target_id.and_then(|t| resolve_target(&snapshot, t)) else {
            return self.rollback(session);
        };
        let current = self.board.relocate(&session.card_id, &target);
        let column_id = current
            .column_of(&session.card_id)
            .map(str::to_string)
            .unwrap_or(target);
        self.commit(&session.card_id, column_id, &session.origin_column_id).await
    }

    /// Reload from the store. An active drag, and commits still in flight,
    /// are re-applied on top of the fresh snapshot.
    pub async fn refresh(&self) -> Result<Arc<BoardSnapshot>, FetchError> {
        let Some(fresh) = self.board.load(self.remote.as_ref()).await? else {
            // A newer reload already applied its overlays
            return Ok(self.board.snapshot());
        };

        let mut overlays: Vec<(String, String)> = self
            .commits
            .lock()
            .iter()
            .map(|(card, slot)| (card.clone(), slot.wanted().to_string()))
            .collect();
        {
            let mut gesture = self.gesture.lock();
            if let Gesture::Dragging(session) = &mut *gesture {
                if let Some(column) = fresh.column_of(&session.card_id) {
                    session.origin_column_id = column.to_string();
                }
                overlays.push((session.card_id.clone(), session.target_column_id.clone()));
            }
        }

        let mut current = fresh;
        for (card_id, column_id) in overlays {
            if current.card(&card_id).is_some() && current.has_column(&column_id) {
                current = self.board.relocate(&card_id, &column_id);
            }
        }
        Ok(current)
    }

    fn take_session(&self, item_id: &str) -> Option<DragSession> {
        let mut gesture = self.gesture.lock();
        match &*gesture {
            Gesture::Dragging(session) if session.card_id == item_id => {}
            _ => return None,
        }
        match std::mem::replace(&mut *gesture, Gesture::Idle) {
            Gesture::Dragging(session) => Some(session),
            Gesture::Idle => None,
        }
    }

    fn rollback(&self, session: DragSession) -> DragOutcome {
        self.board.relocate(&session.card_id, &session.origin_column_id);
        log::debug!("Drag of {} cancelled", session.card_id);
        DragOutcome::Cancelled {
            card_id: session.card_id,
            restored_column_id: session.origin_column_id,
        }
    }

    async fn commit(&self, card_id: &str, column_id: String, origin_column_id: &str) -> DragOutcome {
        {
            let mut commits = self.commits.lock();
            if let Some(slot) = commits.get_mut(card_id) {
                log::debug!("Commit of {} in flight, queueing {}", card_id, column_id);
                slot.pending = Some(column_id.clone());
                return DragOutcome::Coalesced {
                    card_id: card_id.to_string(),
                    column_id,
                };
            }
            commits.insert(
                card_id.to_string(),
                CommitSlot {
                    column_id: column_id.clone(),
                    pending: None,
                },
            );
        }

        let mut column_id = column_id;
        loop {
            if let Err(e) = commands::set_task_status(self.remote.as_ref(), card_id, &column_id).await {
                self.commits.lock().remove(card_id);
                return self.recover(card_id, origin_column_id, CommitError::from_store(card_id, e)).await;
            }
            let next = {
                let mut commits = self.commits.lock();
                let queued = commits.get_mut(card_id).and_then(|slot| {
                    let queued = slot.pending.take().filter(|p| *p != column_id);
                    if let Some(p) = &queued {
                        slot.column_id = p.clone();
                    }
                    queued
                });
                if queued.is_none() {
                    commits.remove(card_id);
                }
                queued
            };
            match next {
                Some(queued) => column_id = queued,
                None => break,
            }
        }

        log::info!("Task {} moved to {}", card_id, column_id);
        if self.notify_on_success {
            self.context.notify(Notification::success(MSG_STATUS_UPDATED));
        }
        self.aggregator.recompute_detached(&self.settled_snapshot());
        DragOutcome::Committed {
            card_id: card_id.to_string(),
            column_id,
        }
    }

    /// Discard speculative state by reloading; fall back to a local
    /// rollback only when the reload itself fails.
    async fn recover(&self, card_id: &str, origin_column_id: &str, error: CommitError) -> DragOutcome {
        log::error!("Failed to move task {}: {}", card_id, error);
        self.context
            .notify(Notification::error(MSG_STATUS_FAILED).with_description(error.to_string()));

        if let Err(e) = self.refresh().await {
            log::error!("{}", e);
            self.context
                .notify(Notification::error(MSG_LOAD_FAILED).with_description(e.to_string()));
            self.board.relocate(card_id, origin_column_id);
        }
        DragOutcome::Failed {
            card_id: card_id.to_string(),
            error,
        }
    }
}

/// A drop target is a column, or a card standing for its column
fn resolve_target(snapshot: &BoardSnapshot, target_id: &str) -> Option<String> {
    if snapshot.has_column(target_id) {
        return Some(target_id.to_string());
    }
    snapshot.column_of(target_id).map(str::to_string)
}
