//! Binding between a drop gate and the platform peer of a running drag.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::DropGate;
use crate::action::ActionMask;
use crate::error::{DndError, DndResult};
use crate::transfer::{DataFlavor, TransferProxy, Transferable};

/// Platform side of a drop zone while a drag is over it.
pub trait DropTargetPeer: Send + Sync {
    /// Actions the zone currently accepts.
    fn set_target_actions(&self, actions: ActionMask);

    fn accept_drag(&self, action: ActionMask);
    fn reject_drag(&self);
    fn accept_drop(&self, action: ActionMask);
    fn reject_drop(&self);
    fn drop_complete(&self, success: bool);

    /// The payload offered by the source.
    fn transferable(&self) -> DndResult<Arc<dyn Transferable>>;

    /// Whether the source lives in this process.
    fn is_transferable_local(&self) -> bool;
}

struct ContextState {
    peer: Option<Arc<dyn DropTargetPeer>>,
    target_actions: ActionMask,
}

/// Per-gate context handed to target listeners through their events.
pub struct DropTargetContext {
    gate: Weak<DropGate>,
    state: Mutex<ContextState>,
}

impl DropTargetContext {
    pub(crate) fn new(gate: Weak<DropGate>, target_actions: ActionMask) -> Self {
        Self {
            gate,
            state: Mutex::new(ContextState {
                peer: None,
                target_actions,
            }),
        }
    }

    /// The gate that owns this context, if it is still alive.
    pub fn drop_gate(&self) -> Option<Arc<DropGate>> {
        self.gate.upgrade()
    }

    /// Bind to `peer`. Target actions reset to the gate's defaults.
    pub fn add_notify(&self, peer: Arc<dyn DropTargetPeer>) {
        let defaults = self
            .gate
            .upgrade()
            .map(|gate| gate.default_actions())
            .unwrap_or(ActionMask::NONE);
        {
            let mut state = self.state.lock();
            state.peer = Some(Arc::clone(&peer));
            state.target_actions = defaults;
        }
        peer.set_target_actions(defaults);
    }

    /// Unbind from the current peer.
    pub fn remove_notify(&self) {
        self.state.lock().peer = None;
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().peer.is_some()
    }

    /// Change the accepted actions, pushing them to the peer if bound.
    pub fn set_target_actions(&self, actions: ActionMask) {
        let peer = {
            let mut state = self.state.lock();
            state.target_actions = actions;
            state.peer.clone()
        };
        if let Some(peer) = peer {
            peer.set_target_actions(actions);
        }
    }

    pub fn target_actions(&self) -> ActionMask {
        self.state.lock().target_actions
    }

    pub fn accept_drag(&self, action: ActionMask) -> DndResult<()> {
        self.peer()?.accept_drag(action);
        Ok(())
    }

    pub fn reject_drag(&self) -> DndResult<()> {
        self.peer()?.reject_drag();
        Ok(())
    }

    pub fn accept_drop(&self, action: ActionMask) -> DndResult<()> {
        self.peer()?.accept_drop(action);
        Ok(())
    }

    pub fn reject_drop(&self) -> DndResult<()> {
        self.peer()?.reject_drop();
        Ok(())
    }

    pub fn drop_complete(&self, success: bool) -> DndResult<()> {
        self.peer()?.drop_complete(success);
        Ok(())
    }

    pub fn current_flavors(&self) -> DndResult<Vec<DataFlavor>> {
        Ok(self.peer()?.transferable()?.flavors())
    }

    pub fn is_flavor_supported(&self, flavor: &DataFlavor) -> DndResult<bool> {
        Ok(self.peer()?.transferable()?.supports(flavor))
    }

    /// The offered payload, copying local objects on fetch.
    pub fn transferable(&self) -> DndResult<TransferProxy> {
        let peer = self.peer()?;
        Ok(TransferProxy::wrap(peer.transferable()?, peer.is_transferable_local()))
    }

    fn peer(&self) -> DndResult<Arc<dyn DropTargetPeer>> {
        self.state.lock().peer.clone().ok_or(DndError::NotBound)
    }
}

impl fmt::Debug for DropTargetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DropTargetContext")
            .field("bound", &state.peer.is_some())
            .field("target_actions", &state.target_actions)
            .finish()
    }
}
