//! Events delivered to the drag source while an operation runs.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use super::negotiator::DragNegotiator;
use crate::action::ActionMask;
use crate::input::Modifiers;

/// Pointer left a target or the drag ended without a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragSourceEvent {
    /// Screen location, when the platform reports one.
    pub location: Option<Point>,
}

/// Status update while the pointer is over a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragSourceDragEvent {
    pub location: Option<Point>,
    /// Action selected by the user's modifiers.
    pub user_action: ActionMask,
    /// Actions the target under the pointer currently accepts.
    pub target_actions: ActionMask,
    pub modifiers: Modifiers,
}

impl DragSourceDragEvent {
    pub fn new(user_action: ActionMask, target_actions: ActionMask) -> Self {
        Self {
            location: None,
            user_action,
            target_actions,
            modifiers: Modifiers::default(),
        }
    }

    pub fn at(mut self, location: Point) -> Self {
        self.location = Some(location);
        self
    }

    /// Action the drop would perform right now.
    pub fn drop_action(&self) -> ActionMask {
        self.user_action & self.target_actions
    }
}

/// Terminal event of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragSourceDropEvent {
    pub location: Option<Point>,
    /// Whether the target completed the drop.
    pub success: bool,
    /// Action the target performed. NONE on failure.
    pub drop_action: ActionMask,
}

impl DragSourceDropEvent {
    pub fn new(success: bool, drop_action: ActionMask) -> Self {
        Self {
            location: None,
            success,
            drop_action: if success { drop_action } else { ActionMask::NONE },
        }
    }
}

/// Result of a finished drag operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOutcome {
    pub success: bool,
    pub action: ActionMask,
}

impl DropOutcome {
    /// Outcome of a drag that ended without a completed drop.
    pub fn failed() -> Self {
        Self {
            success: false,
            action: ActionMask::NONE,
        }
    }
}

impl From<&DragSourceDropEvent> for DropOutcome {
    fn from(event: &DragSourceDropEvent) -> Self {
        Self {
            success: event.success,
            action: event.drop_action,
        }
    }
}

/// Status callbacks received by the source side.
#[derive(Debug, Clone, Copy)]
pub enum SourceEvent<'a> {
    Enter(&'a DragSourceDragEvent),
    Over(&'a DragSourceDragEvent),
    ActionChanged(&'a DragSourceDragEvent),
    Exit(&'a DragSourceEvent),
    Drop(&'a DragSourceDropEvent),
}

/// Receives the status callbacks of a drag operation.
pub trait DragSourceListener: Send + Sync {
    fn on_event(&self, negotiator: &DragNegotiator, event: SourceEvent<'_>);
}

impl<F> DragSourceListener for F
where
    F: Fn(&DragNegotiator, SourceEvent<'_>) + Send + Sync,
{
    fn on_event(&self, negotiator: &DragNegotiator, event: SourceEvent<'_>) {
        self(negotiator, event)
    }
}

/// Receives pointer motion during every operation started from a drag source.
pub trait DragSourceMotionListener: Send + Sync {
    fn drag_mouse_moved(&self, event: &DragSourceDragEvent);
}

impl<F> DragSourceMotionListener for F
where
    F: Fn(&DragSourceDragEvent) + Send + Sync,
{
    fn drag_mouse_moved(&self, event: &DragSourceDragEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_action() {
        let event = DragSourceDragEvent::new(ActionMask::COPY, ActionMask::COPY_OR_MOVE);
        assert_eq!(event.drop_action(), ActionMask::COPY);

        let event = DragSourceDragEvent::new(ActionMask::MOVE, ActionMask::COPY);
        assert_eq!(event.drop_action(), ActionMask::NONE);
    }

    #[test]
    fn test_failed_drop_has_no_action() {
        let event = DragSourceDropEvent::new(false, ActionMask::COPY);
        assert_eq!(event.drop_action, ActionMask::NONE);
        assert_eq!(DropOutcome::from(&event), DropOutcome::failed());
    }
}
