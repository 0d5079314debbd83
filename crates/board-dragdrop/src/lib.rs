//! Board DragDrop Utilities
//!
//! Pointer-driven drag-and-drop gesture tracking, independent of any UI toolkit.
//! Uses movement threshold to distinguish click from drag.
//!
//! The host feeds raw pointer input (`pointer_down`, `pointer_move`,
//! `pointer_enter`, `pointer_leave`, `pointer_up`, `leave_viewport`) and
//! receives the generic drag protocol back as [`DragEvent`]s.

/// Default movement threshold in pixels to start dragging
pub const DEFAULT_ACTIVATION_DISTANCE_PX: f64 = 10.0;

/// Drag protocol events emitted by the tracker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DragEvent<Id> {
    /// Pointer moved past the activation distance while pressed on `Id`
    Start(Id),
    /// Dragged item is over a new target (a column or another item)
    Over { item: Id, target: Id },
    /// Pointer released; `None` when released outside any target
    End { item: Id, target: Option<Id> },
    /// Gesture aborted before release (pointer left the viewport)
    Cancel(Id),
}

/// Pressed but not yet dragging
#[derive(Clone, Debug)]
struct Pending<Id> {
    item: Id,
    start_x: i32,
    start_y: i32,
}

/// Gesture state for one pointer
#[derive(Clone, Debug)]
pub struct PointerTracker<Id> {
    activation_distance: f64,
    pending: Option<Pending<Id>>,
    dragging: Option<Id>,
    drop_target: Option<Id>,
    drag_just_ended: bool,
}

impl<Id: Clone + PartialEq> Default for PointerTracker<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Clone + PartialEq> PointerTracker<Id> {
    pub fn new() -> Self {
        Self::with_activation_distance(DEFAULT_ACTIVATION_DISTANCE_PX)
    }

    pub fn with_activation_distance(px: f64) -> Self {
        Self {
            activation_distance: px.max(0.0),
            pending: None,
            dragging: None,
            drop_target: None,
            drag_just_ended: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn dragging_id(&self) -> Option<&Id> {
        self.dragging.as_ref()
    }

    pub fn drop_target(&self) -> Option<&Id> {
        self.drop_target.as_ref()
    }

    /// Primary-button press on a draggable item.
    /// Records pending drag with start position; ignored while a drag is active.
    pub fn pointer_down(&mut self, item: Id, x: i32, y: i32) {
        if self.dragging.is_some() {
            log::debug!("pointer down ignored: drag already in progress");
            return;
        }
        self.pending = Some(Pending { item, start_x: x, start_y: y });
    }

    /// Pointer movement - starts drag if moved enough
    pub fn pointer_move(&mut self, x: i32, y: i32) -> Option<DragEvent<Id>> {
        if self.dragging.is_some() {
            return None;
        }
        let pending = self.pending.as_ref()?;
        let dx = f64::from(x) - f64::from(pending.start_x);
        let dy = f64::from(y) - f64::from(pending.start_y);
        if (dx * dx + dy * dy).sqrt() < self.activation_distance {
            return None;
        }
        let item = pending.item.clone();
        self.pending = None;
        self.dragging = Some(item.clone());
        self.drop_target = None;
        Some(DragEvent::Start(item))
    }

    /// Pointer entered a drop target (column or item)
    pub fn pointer_enter(&mut self, target: Id) -> Option<DragEvent<Id>> {
        let item = self.dragging.clone()?;
        if self.drop_target.as_ref() == Some(&target) {
            return None;
        }
        self.drop_target = Some(target.clone());
        Some(DragEvent::Over { item, target })
    }

    /// Pointer left the current drop target
    pub fn pointer_leave(&mut self) {
        if self.dragging.is_some() {
            self.drop_target = None;
        }
    }

    /// Pointer released. Returns `End` only if we were actually dragging
    /// (not just clicking).
    pub fn pointer_up(&mut self) -> Option<DragEvent<Id>> {
        self.pending = None;
        let item = self.dragging.take()?;
        let target = self.drop_target.take();
        self.drag_just_ended = true;
        Some(DragEvent::End { item, target })
    }

    /// Pointer left the viewport: abort any drag without a drop
    pub fn leave_viewport(&mut self) -> Option<DragEvent<Id>> {
        self.pending = None;
        self.drop_target = None;
        let item = self.dragging.take()?;
        self.drag_just_ended = true;
        Some(DragEvent::Cancel(item))
    }

    /// The click that follows a drag release should not open the item.
    /// Returns true once per finished drag.
    pub fn take_click_suppression(&mut self) -> bool {
        std::mem::replace(&mut self.drag_just_ended, false)
    }
}
