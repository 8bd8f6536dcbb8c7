//! Single-listener slot shared by recognizers, negotiators and drop gates.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DndError, DndResult};
use crate::input::same_object;

/// Holds at most one listener of type `L`.
///
/// A second listener is refused until the first is removed. Listeners are
/// compared by identity.
pub struct Exclusive<L: ?Sized> {
    slot: Mutex<Option<Arc<L>>>,
}

impl<L: ?Sized> Exclusive<L> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    /// Install `listener`.
    pub fn add(&self, listener: Arc<L>) -> DndResult<()> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(DndError::ListenerAlreadyPresent);
        }
        *slot = Some(listener);
        Ok(())
    }

    /// Remove `listener`, returning it when it was installed.
    ///
    /// Removing `None`, or removing from an empty slot, does nothing. Removing
    /// a listener other than the installed one fails.
    pub fn remove(&self, listener: Option<&Arc<L>>) -> DndResult<Option<Arc<L>>> {
        let Some(listener) = listener else {
            return Ok(None);
        };
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            None => Ok(None),
            Some(current) if same_object(current, listener) => Ok(slot.take()),
            Some(_) => Err(DndError::ListenerMismatch),
        }
    }

    /// Drop whatever listener is installed.
    pub fn clear(&self) -> Option<Arc<L>> {
        self.slot.lock().take()
    }

    /// The installed listener, if any.
    ///
    /// The slot lock is released before returning so callers may invoke the
    /// listener while it re-enters the owner.
    pub fn get(&self) -> Option<Arc<L>> {
        self.slot.lock().clone()
    }

    /// Whether a listener is installed.
    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<L: ?Sized> Default for Exclusive<L> {
    fn default() -> Self {
        Self::new()
    }
}
