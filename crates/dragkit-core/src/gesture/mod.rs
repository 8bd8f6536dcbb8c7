//! Gesture recognition: turning raw pointer input into a drag trigger.
//!
//! A [`GestureRecognizer`] accumulates the events of one component until a
//! concrete policy decides the gesture is complete, then hands a
//! [`DragGesture`] to its single listener and starts over.

mod pointer;

pub use pointer::PointerDragRecognizer;

use std::fmt;
use std::sync::{Arc, Weak};

use kurbo::Point;
use parking_lot::Mutex;

use crate::action::ActionMask;
use crate::error::{DndError, DndResult};
use crate::input::{Component, PointerEvent};
use crate::source::{DragCursor, DragSource, DragSourceListener, DropOutcome};
use crate::subscription::Exclusive;
use crate::transfer::Transferable;

/// A recognized drag gesture: everything needed to start an operation.
#[derive(Clone)]
pub struct DragGesture {
    source: Arc<DragSource>,
    component: Option<Arc<dyn Component>>,
    source_actions: ActionMask,
    action: ActionMask,
    origin: Point,
    events: Vec<PointerEvent>,
}

impl DragGesture {
    /// Bundle a gesture, checking that it can start a drag.
    pub fn new(
        source: Arc<DragSource>,
        component: Option<Arc<dyn Component>>,
        source_actions: ActionMask,
        action: ActionMask,
        origin: Point,
        events: Vec<PointerEvent>,
    ) -> DndResult<Self> {
        let gesture = Self {
            source,
            component,
            source_actions,
            action,
            origin,
            events,
        };
        gesture.validate()?;
        Ok(gesture)
    }

    /// Check the trigger invariants.
    pub fn validate(&self) -> DndResult<()> {
        if self.component.is_none() {
            return Err(DndError::InvalidTrigger("gesture has no component"));
        }
        if !ActionMask::is_valid(self.action.bits()) || !self.action.is_single() {
            return Err(DndError::InvalidTrigger("gesture action is not a single valid action"));
        }
        if !self.source_actions.contains(self.action) {
            return Err(DndError::InvalidTrigger("gesture action is not offered by the source"));
        }
        if self.events.is_empty() {
            return Err(DndError::InvalidTrigger("gesture has no events"));
        }
        Ok(())
    }

    /// Drag source the gesture was recognized for.
    pub fn drag_source(&self) -> &Arc<DragSource> {
        &self.source
    }

    pub fn component(&self) -> Option<&Arc<dyn Component>> {
        self.component.as_ref()
    }

    /// Actions the recognizer permits.
    pub fn source_actions(&self) -> ActionMask {
        self.source_actions
    }

    /// Action proposed by the user's input.
    pub fn action(&self) -> ActionMask {
        self.action
    }

    /// Screen-space location of the first event.
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn events(&self) -> &[PointerEvent] {
        &self.events
    }

    /// The event that began the gesture.
    pub fn trigger_event(&self) -> Option<&PointerEvent> {
        self.events.first()
    }

    /// Start a drag operation from this gesture. Blocks until it ends.
    pub fn start_drag(
        self,
        cursor: Option<DragCursor>,
        payload: Arc<dyn Transferable>,
        listener: Option<Arc<dyn DragSourceListener>>,
    ) -> DndResult<DropOutcome> {
        let source = Arc::clone(&self.source);
        source.start_drag(self, cursor, payload, listener)
    }
}

impl fmt::Debug for DragGesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragGesture")
            .field("component", &self.component.as_ref().map(|c| c.id()))
            .field("source_actions", &self.source_actions)
            .field("action", &self.action)
            .field("origin", &self.origin)
            .field("events", &self.events.len())
            .finish()
    }
}

/// Receives recognized gestures.
pub trait DragGestureListener: Send + Sync {
    /// Called once per recognized gesture. Errors are logged by the recognizer.
    fn drag_gesture_recognized(&self, gesture: DragGesture) -> DndResult<()>;
}

impl<F> DragGestureListener for F
where
    F: Fn(DragGesture) -> DndResult<()> + Send + Sync,
{
    fn drag_gesture_recognized(&self, gesture: DragGesture) -> DndResult<()> {
        self(gesture)
    }
}

/// Hooks a concrete recognizer into a component's input stream.
pub trait InputBinding: Send + Sync {
    fn register(&self, component: &Arc<dyn Component>);
    fn unregister(&self, component: &Arc<dyn Component>);
}

struct RecognizerState {
    /// Weak: the component keeps the recognizer alive through its input
    /// registration.
    component: Option<Weak<dyn Component>>,
    source_actions: ActionMask,
    /// `None` until the first event is appended.
    events: Option<Vec<PointerEvent>>,
}

/// Input-agnostic part of a gesture recognizer.
///
/// Concrete recognizers own one of these, decide from their input when to
/// [`append`](Self::append), [`fire_recognized`](Self::fire_recognized) or
/// [`reset`](Self::reset), and supply an [`InputBinding`] so the recognizer
/// only listens to its component while a gesture listener is installed.
pub struct GestureRecognizer {
    source: Arc<DragSource>,
    state: Mutex<RecognizerState>,
    listener: Exclusive<dyn DragGestureListener>,
    binding: Box<dyn InputBinding>,
}

impl GestureRecognizer {
    pub fn new(
        source: Arc<DragSource>,
        component: Option<Arc<dyn Component>>,
        source_actions: ActionMask,
        binding: Box<dyn InputBinding>,
    ) -> Self {
        Self {
            source,
            state: Mutex::new(RecognizerState {
                component: component.as_ref().map(Arc::downgrade),
                source_actions: ActionMask::from_bits_truncate(source_actions.bits()),
                events: None,
            }),
            listener: Exclusive::new(),
            binding,
        }
    }

    pub fn drag_source(&self) -> &Arc<DragSource> {
        &self.source
    }

    /// The recognizer's component, if it is still alive.
    pub fn component(&self) -> Option<Arc<dyn Component>> {
        self.state.lock().component.as_ref().and_then(Weak::upgrade)
    }

    /// Move the recognizer to another component.
    ///
    /// While a listener is installed, input registration follows the component.
    pub fn set_component(&self, component: Option<Arc<dyn Component>>) {
        let old = std::mem::replace(&mut self.state.lock().component, component.as_ref().map(Arc::downgrade));
        if !self.listener.is_set() {
            return;
        }
        if let Some(old) = old.as_ref().and_then(Weak::upgrade) {
            self.binding.unregister(&old);
        }
        if let Some(new) = component {
            self.binding.register(&new);
        }
    }

    pub fn source_actions(&self) -> ActionMask {
        self.state.lock().source_actions
    }

    /// Set the permitted actions. Unknown bits are dropped.
    pub fn set_source_actions(&self, actions: ActionMask) {
        self.state.lock().source_actions = ActionMask::from_bits_truncate(actions.bits());
    }

    /// Install the gesture listener and start listening to the component.
    pub fn add_listener(&self, listener: Arc<dyn DragGestureListener>) -> DndResult<()> {
        self.listener.add(listener)?;
        if let Some(component) = self.component() {
            self.binding.register(&component);
        }
        Ok(())
    }

    /// Remove the gesture listener and stop listening to the component.
    pub fn remove_listener(&self, listener: Option<&Arc<dyn DragGestureListener>>) -> DndResult<()> {
        if self.listener.remove(listener)?.is_some() {
            if let Some(component) = self.component() {
                self.binding.unregister(&component);
            }
        }
        Ok(())
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_set()
    }

    /// Add an event to the gesture being accumulated. `None` is ignored.
    pub fn append(&self, event: Option<PointerEvent>) {
        if let Some(event) = event {
            self.state.lock().events.get_or_insert_with(Vec::new).push(event);
        }
    }

    /// First accumulated event.
    pub fn trigger_event(&self) -> Option<PointerEvent> {
        self.state.lock().events.as_ref().and_then(|events| events.first().cloned())
    }

    /// Snapshot of the accumulated events.
    pub fn events(&self) -> Vec<PointerEvent> {
        self.state.lock().events.clone().unwrap_or_default()
    }

    /// Discard the accumulated events.
    ///
    /// Fails if no event was ever appended.
    pub fn reset(&self) -> DndResult<()> {
        match self.state.lock().events.as_mut() {
            Some(events) => {
                events.clear();
                Ok(())
            }
            None => Err(DndError::NotInitialized),
        }
    }

    /// Discard the accumulated events, if any.
    pub(crate) fn clear(&self) {
        if let Some(events) = self.state.lock().events.as_mut() {
            events.clear();
        }
    }

    /// Report a recognized gesture to the listener, then start over.
    ///
    /// Listener failures are logged and swallowed. The accumulated events are
    /// cleared whether or not a listener ran.
    pub fn fire_recognized(&self, action: ActionMask, origin: Point) -> DndResult<()> {
        let result = match self.listener.get() {
            Some(listener) => self.build_gesture(action, origin).map(|gesture| {
                if let Err(e) = listener.drag_gesture_recognized(gesture) {
                    log::warn!("Drag gesture listener failed: {}", e);
                }
            }),
            None => Ok(()),
        };
        self.clear();
        result
    }

    fn build_gesture(&self, action: ActionMask, origin: Point) -> DndResult<DragGesture> {
        let (component, source_actions, events) = {
            let state = self.state.lock();
            (
                state.component.as_ref().and_then(Weak::upgrade),
                state.source_actions,
                state.events.clone().unwrap_or_default(),
            )
        };
        DragGesture::new(self.source.clone(), component, source_actions, action, origin, events)
    }
}
