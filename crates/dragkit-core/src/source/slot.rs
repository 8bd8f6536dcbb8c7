//! The single "operation in flight" slot.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DndError, DndResult};

/// Identifier of one drag operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Admits at most one drag operation at a time.
#[derive(Debug, Default)]
pub struct OperationSlot {
    active: Mutex<Option<OperationId>>,
}

impl OperationSlot {
    /// Create a free slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot shared by every drag source in the process.
    pub fn global() -> Arc<OperationSlot> {
        static GLOBAL: OnceLock<Arc<OperationSlot>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(OperationSlot::new())).clone()
    }

    /// Occupy the slot, failing fast if another operation holds it.
    ///
    /// The slot is freed when the returned guard is dropped.
    pub fn try_acquire(self: &Arc<Self>) -> DndResult<OperationGuard> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(DndError::Busy);
        }
        let id = OperationId::new();
        *active = Some(id);
        log::debug!("Drag operation {:?} acquired the slot", id.0);
        Ok(OperationGuard {
            slot: Arc::clone(self),
            id,
        })
    }

    /// Operation currently holding the slot.
    pub fn active(&self) -> Option<OperationId> {
        *self.active.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.active.lock().is_some()
    }
}

/// Ownership token for the operation slot.
#[derive(Debug)]
pub struct OperationGuard {
    slot: Arc<OperationSlot>,
    id: OperationId,
}

impl OperationGuard {
    pub fn id(&self) -> OperationId {
        self.id
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let mut active = self.slot.active.lock();
        if *active == Some(self.id) {
            *active = None;
            log::debug!("Drag operation {:?} released the slot", self.id.0);
        }
    }
}
