//! Events delivered to drop target listeners.

use std::sync::Arc;

use kurbo::Point;

use super::DropTargetContext;
use crate::action::ActionMask;
use crate::error::DndResult;
use crate::transfer::{DataFlavor, TransferProxy};

/// The pointer left the drop zone.
#[derive(Debug, Clone)]
pub struct DropTargetEvent {
    context: Arc<DropTargetContext>,
}

impl DropTargetEvent {
    pub fn new(context: Arc<DropTargetContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<DropTargetContext> {
        &self.context
    }
}

/// The pointer entered, moved over, or changed action inside the drop zone.
#[derive(Debug, Clone)]
pub struct DropTargetDragEvent {
    context: Arc<DropTargetContext>,
    location: Point,
    drop_action: ActionMask,
    source_actions: ActionMask,
}

impl DropTargetDragEvent {
    pub fn new(
        context: Arc<DropTargetContext>,
        location: Point,
        drop_action: ActionMask,
        source_actions: ActionMask,
    ) -> Self {
        Self {
            context,
            location,
            drop_action,
            source_actions,
        }
    }

    pub fn context(&self) -> &Arc<DropTargetContext> {
        &self.context
    }

    /// Pointer location in the component's coordinates.
    pub fn location(&self) -> Point {
        self.location
    }

    /// Action the user currently requests.
    pub fn drop_action(&self) -> ActionMask {
        self.drop_action
    }

    /// Actions the source offers.
    pub fn source_actions(&self) -> ActionMask {
        self.source_actions
    }

    /// Accept the drag with `action` for the current pointer position.
    pub fn accept_drag(&self, action: ActionMask) -> DndResult<()> {
        self.context.accept_drag(action)
    }

    pub fn reject_drag(&self) -> DndResult<()> {
        self.context.reject_drag()
    }

    pub fn current_flavors(&self) -> DndResult<Vec<DataFlavor>> {
        self.context.current_flavors()
    }

    pub fn is_flavor_supported(&self, flavor: &DataFlavor) -> DndResult<bool> {
        self.context.is_flavor_supported(flavor)
    }

    /// The offered payload. Fetching during a drag may be refused by the platform.
    pub fn transferable(&self) -> DndResult<TransferProxy> {
        self.context.transferable()
    }
}

/// The user released the pointer over the drop zone.
#[derive(Debug, Clone)]
pub struct DropTargetDropEvent {
    context: Arc<DropTargetContext>,
    location: Point,
    drop_action: ActionMask,
    source_actions: ActionMask,
    is_local: bool,
}

impl DropTargetDropEvent {
    pub fn new(
        context: Arc<DropTargetContext>,
        location: Point,
        drop_action: ActionMask,
        source_actions: ActionMask,
        is_local: bool,
    ) -> Self {
        Self {
            context,
            location,
            drop_action,
            source_actions,
            is_local,
        }
    }

    pub fn context(&self) -> &Arc<DropTargetContext> {
        &self.context
    }

    pub fn location(&self) -> Point {
        self.location
    }

    pub fn drop_action(&self) -> ActionMask {
        self.drop_action
    }

    pub fn source_actions(&self) -> ActionMask {
        self.source_actions
    }

    /// Whether source and target live in the same process.
    pub fn is_local_transfer(&self) -> bool {
        self.is_local
    }

    pub fn accept_drop(&self, action: ActionMask) -> DndResult<()> {
        self.context.accept_drop(action)
    }

    pub fn reject_drop(&self) -> DndResult<()> {
        self.context.reject_drop()
    }

    /// Report whether the data was taken. Ends the operation on the target side.
    pub fn drop_complete(&self, success: bool) -> DndResult<()> {
        self.context.drop_complete(success)
    }

    pub fn current_flavors(&self) -> DndResult<Vec<DataFlavor>> {
        self.context.current_flavors()
    }

    pub fn is_flavor_supported(&self, flavor: &DataFlavor) -> DndResult<bool> {
        self.context.is_flavor_supported(flavor)
    }

    pub fn transferable(&self) -> DndResult<TransferProxy> {
        self.context.transferable()
    }
}

/// Notifications received by a drop zone.
#[derive(Debug, Clone, Copy)]
pub enum TargetEvent<'a> {
    DragEnter(&'a DropTargetDragEvent),
    DragOver(&'a DropTargetDragEvent),
    DropActionChanged(&'a DropTargetDragEvent),
    DragExit(&'a DropTargetEvent),
    Drop(&'a DropTargetDropEvent),
}

impl TargetEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            TargetEvent::DragEnter(_) => "drag enter",
            TargetEvent::DragOver(_) => "drag over",
            TargetEvent::DropActionChanged(_) => "drop action changed",
            TargetEvent::DragExit(_) => "drag exit",
            TargetEvent::Drop(_) => "drop",
        }
    }
}

/// Receives the notifications of a drop zone.
pub trait DropTargetListener: Send + Sync {
    fn on_event(&self, event: TargetEvent<'_>);
}

impl<F> DropTargetListener for F
where
    F: Fn(TargetEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: TargetEvent<'_>) {
        self(event)
    }
}
