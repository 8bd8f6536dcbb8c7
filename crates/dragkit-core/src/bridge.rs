//! Interface to the platform layer that performs the physical drag.

use std::sync::Arc;

use crate::error::DndResult;
use crate::gesture::DragGesture;
use crate::source::{DragCursor, DragNegotiator, DropOutcome};

/// Platform layer that tracks the pointer during a drag.
///
/// While an operation handle runs, the bridge reports status changes to the
/// negotiator and dispatches target notifications to the drop gates under
/// the pointer.
pub trait PlatformBridge: Send + Sync {
    /// Prepare the platform side of an operation.
    fn create_operation_handle(
        &self,
        trigger: &DragGesture,
        negotiator: Arc<DragNegotiator>,
    ) -> DndResult<Arc<dyn OperationHandle>>;

    /// Drag threshold configured on the platform, in logical pixels.
    fn drag_threshold(&self) -> Option<f64> {
        None
    }
}

/// Platform side of one running operation.
pub trait OperationHandle: Send + Sync {
    /// Run the drag loop until the drop completes or the drag is aborted.
    fn run(&self, cursor: &DragCursor) -> DndResult<DropOutcome>;

    /// Change the displayed cursor.
    fn set_cursor(&self, cursor: &DragCursor);

    /// The payload's flavor list changed mid-drag.
    fn notify_flavors_changed(&self);
}
