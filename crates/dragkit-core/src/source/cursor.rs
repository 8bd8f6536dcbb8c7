//! Drag cursor feedback.

use serde::{Deserialize, Serialize};

use crate::action::ActionMask;
use crate::error::{DndError, DndResult};

/// Where the pointer is relative to a drop target when feedback is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// No target under the pointer.
    #[default]
    Default,
    Enter,
    Over,
    /// The target's accepted actions changed.
    Changed,
    Exit,
}

/// Cursor shown while dragging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DragCursor {
    CopyDrop,
    MoveDrop,
    LinkDrop,
    CopyNoDrop,
    MoveNoDrop,
    LinkNoDrop,
    /// Platform cursor chosen explicitly by the client.
    Named(String),
}

impl DragCursor {
    /// Look up the cursor for a single action.
    ///
    /// `enabled` selects the "drop possible" variant.
    pub fn for_action(action: ActionMask, enabled: bool) -> DndResult<DragCursor> {
        const TABLE: [(ActionMask, DragCursor, DragCursor); 3] = [
            (ActionMask::COPY, DragCursor::CopyDrop, DragCursor::CopyNoDrop),
            (ActionMask::MOVE, DragCursor::MoveDrop, DragCursor::MoveNoDrop),
            (ActionMask::LINK, DragCursor::LinkDrop, DragCursor::LinkNoDrop),
        ];

        TABLE
            .iter()
            .find(|(a, _, _)| *a == action)
            .map(|(_, drop, no_drop)| if enabled { drop.clone() } else { no_drop.clone() })
            .ok_or(DndError::InvalidAction(action.bits()))
    }

    /// Compute feedback for the current negotiation state.
    ///
    /// Returns the chosen action and its cursor. When the target accepts none
    /// of `source_action` the cursor shows the "no drop" variant of the
    /// source's best action.
    pub fn feedback(source_action: ActionMask, target_actions: ActionMask, status: Status) -> DndResult<(ActionMask, DragCursor)> {
        let target = if status == Status::Default {
            ActionMask::NONE
        } else {
            target_actions
        };
        let possible = source_action & target;

        let (action, enabled) = if possible.is_empty() {
            (source_action.best_action(), false)
        } else {
            (possible.best_action(), true)
        };
        Ok((action, Self::for_action(action, enabled)?))
    }

    /// Platform name of the cursor.
    pub fn name(&self) -> &str {
        match self {
            Self::CopyDrop => "copy-drop",
            Self::MoveDrop => "move-drop",
            Self::LinkDrop => "link-drop",
            Self::CopyNoDrop => "copy-no-drop",
            Self::MoveNoDrop => "move-no-drop",
            Self::LinkNoDrop => "link-no-drop",
            Self::Named(name) => name,
        }
    }

    /// Whether the cursor signals that a drop would be accepted.
    pub fn is_drop_enabled(&self) -> bool {
        matches!(self, Self::CopyDrop | Self::MoveDrop | Self::LinkDrop)
    }
}
