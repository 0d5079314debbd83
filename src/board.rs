//! Board
//!
//! One mounted project board: the snapshot cache, the drag engine, the
//! progress aggregator and the change-feed sync, wired together.

use std::sync::Arc;

use parking_lot::Mutex;

use board_dragdrop::{DragEvent, PointerTracker};
use kanban_store::{RemoteStore, Status, Task};

use crate::commands::{self, CreateTaskArgs, UpdateTaskArgs};
use crate::config::BoardConfig;
use crate::context::{BoardContext, Notification};
use crate::engine::{DragEngine, DragOutcome, DragPhase, MSG_LOAD_FAILED};
use crate::error::{BoardResult, FetchError};
use crate::progress::ProgressAggregator;
use crate::realtime::BoardSync;
use crate::store::{BoardSnapshot, BoardStore};

const MSG_SAVE_FAILED: &str = "Failed to save task";

pub struct Board {
    project_id: String,
    remote: Arc<dyn RemoteStore>,
    context: BoardContext,
    notify_on_success: bool,
    store: Arc<BoardStore>,
    engine: Arc<DragEngine>,
    aggregator: Arc<ProgressAggregator>,
    pointer: Mutex<PointerTracker<String>>,
    sync: Option<BoardSync>,
}

impl Board {
    /// Load the board, publish its progress and start following remote
    /// changes. A failed first load is reported and leaves the board empty.
    pub async fn mount(
        remote: Arc<dyn RemoteStore>,
        project_id: &str,
        config: &BoardConfig,
        context: BoardContext,
    ) -> Self {
        let store = Arc::new(BoardStore::new(project_id, context.clone()));
        let aggregator = Arc::new(ProgressAggregator::new(
            remote.clone(),
            context.clone(),
            config.done_column_name.clone(),
        ));
        let engine = Arc::new(DragEngine::new(
            remote.clone(),
            store.clone(),
            aggregator.clone(),
            context.clone(),
            config.notify_on_success,
        ));

        let mut board = Self {
            project_id: project_id.to_string(),
            remote,
            context,
            notify_on_success: config.notify_on_success,
            store,
            engine,
            aggregator,
            pointer: Mutex::new(PointerTracker::with_activation_distance(config.activation_distance_px)),
            sync: None,
        };

        match board.store.load_snapshot(board.remote.as_ref()).await {
            Ok(snapshot) => {
                log::info!(
                    "Mounted board {} with {} columns and {} cards",
                    board.project_id,
                    snapshot.columns().len(),
                    snapshot.cards().len()
                );
                board.aggregator.recompute(&snapshot).await;
            }
            Err(e) => board.report_fetch_error(&e),
        }

        board.sync = Some(BoardSync::start(
            board.remote.as_ref(),
            &board.project_id,
            board.engine.clone(),
            board.aggregator.clone(),
            board.context.clone(),
        ));
        board
    }

    /// Stop following remote changes and release the cache
    pub fn unmount(mut self) {
        self.sync = None;
        log::info!("Unmounted board {}", self.project_id);
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn context(&self) -> &BoardContext {
        &self.context
    }

    pub fn snapshot(&self) -> Arc<BoardSnapshot> {
        self.store.snapshot()
    }

    pub fn columns(&self) -> Vec<Status> {
        self.store.snapshot().columns().to_vec()
    }

    /// Cards currently in a column, for rendering
    pub fn cards_in_column(&self, column_id: &str) -> Vec<Task> {
        self.store.cards_in_column(column_id)
    }

    pub fn phase(&self) -> DragPhase {
        self.engine.phase()
    }

    pub fn progress(&self) -> Option<u8> {
        self.context.progress()
    }

    // ========================
    // Drag Protocol
    // ========================

    pub fn on_drag_start(&self, item_id: &str) -> bool {
        self.engine.on_drag_start(item_id)
    }

    pub fn on_drag_over(&self, item_id: &str, target_id: &str) -> bool {
        self.engine.on_drag_over(item_id, target_id)
    }

    pub async fn on_drag_end(&self, item_id: &str, target_id: Option<&str>) -> DragOutcome {
        self.engine.on_drag_end(item_id, target_id).await
    }

    pub fn on_drag_cancel(&self, item_id: &str) -> DragOutcome {
        self.engine.on_drag_cancel(item_id)
    }

    /// Feed one gesture event into the engine
    pub async fn dispatch(&self, event: DragEvent<String>) -> Option<DragOutcome> {
        match event {
            DragEvent::Start(item) => {
                self.on_drag_start(&item);
                None
            }
            DragEvent::Over { item, target } => {
                self.on_drag_over(&item, &target);
                None
            }
            DragEvent::End { item, target } => Some(self.on_drag_end(&item, target.as_deref()).await),
            DragEvent::Cancel(item) => Some(self.on_drag_cancel(&item)),
        }
    }

    // ========================
    // Raw Pointer Input
    // ========================

    pub fn pointer_down(&self, item_id: &str, x: i32, y: i32) {
        self.pointer.lock().pointer_down(item_id.to_string(), x, y);
    }

    pub async fn pointer_move(&self, x: i32, y: i32) {
        let event = self.pointer.lock().pointer_move(x, y);
        if let Some(event) = event {
            self.dispatch(event).await;
        }
    }

    pub async fn pointer_enter(&self, target_id: &str) {
        let event = self.pointer.lock().pointer_enter(target_id.to_string());
        if let Some(event) = event {
            self.dispatch(event).await;
        }
    }

    pub fn pointer_leave(&self) {
        self.pointer.lock().pointer_leave();
    }

    pub async fn pointer_up(&self) -> Option<DragOutcome> {
        let event = self.pointer.lock().pointer_up()?;
        self.dispatch(event).await
    }

    pub async fn leave_viewport(&self) -> Option<DragOutcome> {
        let event = self.pointer.lock().leave_viewport()?;
        self.dispatch(event).await
    }

    /// True once after a drag, so the trailing click does not open the card
    pub fn take_click_suppression(&self) -> bool {
        self.pointer.lock().take_click_suppression()
    }

    // ========================
    // Task Editing
    // ========================

    /// Re-fetch from the store and recompute progress
    pub async fn reload(&self) -> Result<Arc<BoardSnapshot>, FetchError> {
        match self.engine.refresh().await {
            Ok(snapshot) => {
                self.aggregator.recompute(&self.engine.settled_snapshot()).await;
                Ok(snapshot)
            }
            Err(e) => {
                self.report_fetch_error(&e);
                Err(e)
            }
        }
    }

    pub async fn create_task(&self, args: &CreateTaskArgs<'_>) -> BoardResult<Task> {
        let result = commands::create_task(self.remote.as_ref(), args).await;
        self.after_edit(result, "Task created successfully", MSG_SAVE_FAILED).await
    }

    pub async fn update_task(&self, task_id: &str, args: &UpdateTaskArgs) -> BoardResult<Task> {
        let result = commands::update_task(self.remote.as_ref(), task_id, args).await;
        self.after_edit(result, "Task updated successfully", MSG_SAVE_FAILED).await
    }

    pub async fn delete_task(&self, task_id: &str) -> BoardResult<()> {
        let result = commands::delete_task(self.remote.as_ref(), task_id).await;
        self.after_edit(result, "Task deleted successfully", "Failed to delete task").await
    }

    async fn after_edit<T>(
        &self,
        result: kanban_store::DomainResult<T>,
        success: &str,
        failure: &str,
    ) -> BoardResult<T> {
        match result {
            Ok(value) => {
                if self.notify_on_success {
                    self.context.notify(Notification::success(success));
                }
                self.reload().await?;
                Ok(value)
            }
            Err(e) => {
                log::error!("{}: {}", failure, e);
                self.context
                    .notify(Notification::error(failure).with_description(e.to_string()));
                Err(e.into())
            }
        }
    }

    fn report_fetch_error(&self, e: &FetchError) {
        log::error!("{}", e);
        self.context
            .notify(Notification::error(MSG_LOAD_FAILED).with_description(e.to_string()));
    }
}
