//! Source side of drag-and-drop.
//!
//! A [`DragSource`] is the long-lived object a component drags from. Each
//! recognized gesture starts one operation, driven by a [`DragNegotiator`]
//! that tracks the negotiated action and the cursor feedback. At most one
//! operation runs at a time per [`OperationSlot`].

mod cursor;
mod events;
mod negotiator;
mod slot;

pub use cursor::{DragCursor, Status};
pub use events::{
    DragSourceDragEvent, DragSourceDropEvent, DragSourceEvent, DragSourceListener, DragSourceMotionListener,
    DropOutcome, SourceEvent,
};
pub use negotiator::DragNegotiator;
pub use slot::{OperationGuard, OperationId, OperationSlot};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::action::ActionMask;
use crate::bridge::PlatformBridge;
use crate::config::DndConfig;
use crate::error::{DndError, DndResult};
use crate::gesture::{DragGesture, DragGestureListener, PointerDragRecognizer};
use crate::input::{Component, same_object};
use crate::transfer::{FlavorMap, SystemFlavorMap, Transferable};

/// Object components drag from.
pub struct DragSource {
    bridge: Arc<dyn PlatformBridge>,
    slot: Arc<OperationSlot>,
    config: DndConfig,
    flavor_map: Arc<dyn FlavorMap>,
    listeners: Mutex<Vec<Arc<dyn DragSourceListener>>>,
    motion_listeners: Mutex<Vec<Arc<dyn DragSourceMotionListener>>>,
}

impl DragSource {
    /// Drag source using the process-wide operation slot and environment configuration.
    pub fn new(bridge: Arc<dyn PlatformBridge>) -> Arc<Self> {
        Self::with_slot(bridge, OperationSlot::global(), DndConfig::from_env())
    }

    /// Drag source with an explicit slot and configuration.
    pub fn with_slot(bridge: Arc<dyn PlatformBridge>, slot: Arc<OperationSlot>, config: DndConfig) -> Arc<Self> {
        Arc::new(Self {
            bridge,
            slot,
            config,
            flavor_map: SystemFlavorMap::shared(),
            listeners: Mutex::new(Vec::new()),
            motion_listeners: Mutex::new(Vec::new()),
        })
    }

    /// Recognizer turning pointer input on `component` into gestures for this source.
    pub fn create_recognizer(
        self: &Arc<Self>,
        component: Option<Arc<dyn Component>>,
        actions: ActionMask,
        listener: Option<Arc<dyn DragGestureListener>>,
    ) -> DndResult<Arc<PointerDragRecognizer>> {
        PointerDragRecognizer::new(Arc::clone(self), component, actions, listener)
    }

    /// Start an operation from a gesture recognized for this source.
    ///
    /// Blocks until the platform bridge finishes the drag.
    pub fn start_drag(
        &self,
        trigger: DragGesture,
        cursor: Option<DragCursor>,
        payload: Arc<dyn Transferable>,
        listener: Option<Arc<dyn DragSourceListener>>,
    ) -> DndResult<DropOutcome> {
        if !std::ptr::eq(Arc::as_ptr(trigger.drag_source()), self) {
            return Err(DndError::InvalidTrigger("gesture belongs to another drag source"));
        }
        DragNegotiator::start(trigger, cursor, payload, listener)
    }

    pub fn bridge(&self) -> &Arc<dyn PlatformBridge> {
        &self.bridge
    }

    pub fn slot(&self) -> &Arc<OperationSlot> {
        &self.slot
    }

    pub fn config(&self) -> &DndConfig {
        &self.config
    }

    pub fn flavor_map(&self) -> &Arc<dyn FlavorMap> {
        &self.flavor_map
    }

    /// Whether an operation currently holds this source's slot.
    pub fn is_dragging(&self) -> bool {
        self.slot.is_busy()
    }

    /// Pointer travel needed before a press becomes a drag.
    pub fn drag_threshold(&self) -> f64 {
        self.config.resolve_threshold(self.bridge.drag_threshold())
    }

    /// Observe every operation started from this source.
    pub fn add_drag_source_listener(&self, listener: Arc<dyn DragSourceListener>) {
        self.listeners.lock().push(listener);
    }

    /// Returns whether the listener was registered.
    pub fn remove_drag_source_listener(&self, listener: &Arc<dyn DragSourceListener>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_object(l, listener));
        listeners.len() != before
    }

    pub fn add_motion_listener(&self, listener: Arc<dyn DragSourceMotionListener>) {
        self.motion_listeners.lock().push(listener);
    }

    /// Returns whether the listener was registered.
    pub fn remove_motion_listener(&self, listener: &Arc<dyn DragSourceMotionListener>) -> bool {
        let mut listeners = self.motion_listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_object(l, listener));
        listeners.len() != before
    }

    pub(crate) fn notify(&self, negotiator: &DragNegotiator, event: SourceEvent<'_>) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_event(negotiator, event);
        }
    }

    pub(crate) fn notify_motion(&self, event: &DragSourceDragEvent) {
        let listeners = self.motion_listeners.lock().clone();
        for listener in listeners {
            listener.drag_mouse_moved(event);
        }
    }
}
