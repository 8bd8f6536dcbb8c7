//! Drop action masks and the negotiation rules shared by source and target.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{DndError, DndResult};
use crate::input::{Buttons, Modifiers};

bitflags! {
    /// Set of drop actions offered by a source or accepted by a target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ActionMask: u32 {
        /// Copy the data to the drop location.
        const COPY = 0x1;
        /// Move the data to the drop location.
        const MOVE = 0x2;
        /// Either copy or move.
        const COPY_OR_MOVE = Self::COPY.bits() | Self::MOVE.bits();
        /// Link the drop location to the data.
        const LINK = 0x4000_0000;
    }
}

impl Default for ActionMask {
    fn default() -> Self {
        Self::NONE
    }
}

impl ActionMask {
    /// No action.
    pub const NONE: Self = Self::empty();

    /// Check that `bits` only uses COPY, MOVE and LINK.
    pub fn is_valid(bits: u32) -> bool {
        bits & !Self::all().bits() == 0
    }

    /// Build a mask from raw bits, rejecting unknown bits.
    pub fn from_raw(bits: u32) -> DndResult<Self> {
        if Self::is_valid(bits) {
            Ok(Self::from_bits_retain(bits))
        } else {
            Err(DndError::InvalidAction(bits))
        }
    }

    /// Pick a single action out of the mask.
    ///
    /// Priority is MOVE, then COPY, then LINK. An empty mask also yields
    /// MOVE; callers should not rely on that.
    pub fn best_action(self) -> ActionMask {
        if self.contains(Self::MOVE) {
            Self::MOVE
        } else if self.contains(Self::COPY) {
            Self::COPY
        } else if self.contains(Self::LINK) {
            Self::LINK
        } else {
            Self::MOVE
        }
    }

    /// Whether exactly one of COPY, MOVE or LINK is set.
    pub fn is_single(self) -> bool {
        self == Self::COPY || self == Self::MOVE || self == Self::LINK
    }

    /// Map the keyboard modifiers held during a pointer drag to a drop action.
    ///
    /// Exactly one pointer button must be held. Ctrl+Shift links, Ctrl
    /// copies, Shift moves; with no modifier the first of MOVE, COPY, LINK
    /// offered by `source_actions` is used. The result is always a subset of
    /// `source_actions`.
    pub fn from_modifiers(modifiers: Modifiers, buttons: Buttons, source_actions: ActionMask) -> ActionMask {
        if !buttons.is_single() {
            return Self::NONE;
        }

        let action = match (modifiers.ctrl, modifiers.shift) {
            (true, true) => Self::LINK,
            (true, false) => Self::COPY,
            (false, true) => Self::MOVE,
            (false, false) => {
                if source_actions.contains(Self::MOVE) {
                    Self::MOVE
                } else if source_actions.contains(Self::COPY) {
                    Self::COPY
                } else if source_actions.contains(Self::LINK) {
                    Self::LINK
                } else {
                    Self::NONE
                }
            }
        };

        action & source_actions
    }
}
