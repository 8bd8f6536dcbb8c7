//! In-process stand-ins for the window system and the platform drag loop.
//!
//! [`HeadlessComponent`] delivers pointer events pushed by the caller and
//! [`HeadlessBridge`] plays a scripted drag across drop gates. Together they
//! run the whole protocol without a display, for tests and demos.

use std::sync::Arc;

use kurbo::Point;
use parking_lot::Mutex;

use crate::action::ActionMask;
use crate::bridge::{OperationHandle, PlatformBridge};
use crate::error::{DndError, DndResult};
use crate::gesture::DragGesture;
use crate::input::{same_object, Component, ComponentId, PointerEvent, PointerListener};
use crate::source::{DragCursor, DragNegotiator, DragSourceDragEvent, DragSourceDropEvent, DragSourceEvent, DropOutcome};
use crate::target::{DropGate, DropTargetDragEvent, DropTargetDropEvent, DropTargetEvent, DropTargetPeer};
use crate::transfer::Transferable;

/// Component whose pointer input is pushed by the caller.
pub struct HeadlessComponent {
    id: ComponentId,
    listeners: Mutex<Vec<Arc<dyn PointerListener>>>,
}

impl HeadlessComponent {
    pub fn new() -> Self {
        Self {
            id: ComponentId::new(),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Deliver `event` to every registered pointer listener.
    pub fn dispatch(&self, event: &PointerEvent) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_pointer(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for HeadlessComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HeadlessComponent {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn add_pointer_listener(&self, listener: Arc<dyn PointerListener>) {
        self.listeners.lock().push(listener);
    }

    fn remove_pointer_listener(&self, listener: &Arc<dyn PointerListener>) {
        self.listeners.lock().retain(|l| !same_object(l, listener));
    }
}

/// One step of a scripted drag.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Pointer moves with no target change.
    Motion { location: Point, user_action: ActionMask },
    Enter {
        gate: Arc<DropGate>,
        location: Point,
        user_action: ActionMask,
    },
    Over {
        gate: Arc<DropGate>,
        location: Point,
        user_action: ActionMask,
    },
    /// The user pressed or released a modifier over `gate`.
    ActionChanged {
        gate: Arc<DropGate>,
        location: Point,
        user_action: ActionMask,
    },
    Exit { gate: Arc<DropGate> },
    Drop { gate: Arc<DropGate>, location: Point },
    /// The platform gives up with an error.
    Abort(String),
}

/// Bridge that replays a script instead of tracking a real pointer.
///
/// Each operation consumes the script set before it started.
pub struct HeadlessBridge {
    threshold: Option<f64>,
    local: bool,
    script: Mutex<Vec<ScriptStep>>,
    cursors: Arc<Mutex<Vec<DragCursor>>>,
    flavor_notifications: Arc<Mutex<usize>>,
}

impl HeadlessBridge {
    pub fn new() -> Self {
        Self {
            threshold: None,
            local: true,
            script: Mutex::new(Vec::new()),
            cursors: Arc::new(Mutex::new(Vec::new())),
            flavor_notifications: Arc::new(Mutex::new(0)),
        }
    }

    /// Report `threshold` as the platform drag threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Pretend targets live in another process.
    pub fn remote(mut self) -> Self {
        self.local = false;
        self
    }

    pub fn set_script(&self, script: Vec<ScriptStep>) {
        *self.script.lock() = script;
    }

    /// Every cursor shown so far, starting with the initial one.
    pub fn cursor_log(&self) -> Vec<DragCursor> {
        self.cursors.lock().clone()
    }

    pub fn flavor_notifications(&self) -> usize {
        *self.flavor_notifications.lock()
    }
}

impl Default for HeadlessBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for HeadlessBridge {
    fn create_operation_handle(
        &self,
        trigger: &DragGesture,
        negotiator: Arc<DragNegotiator>,
    ) -> DndResult<Arc<dyn OperationHandle>> {
        let script = std::mem::take(&mut *self.script.lock());
        log::debug!("Headless drag with {} scripted steps", script.len());
        Ok(Arc::new(HeadlessHandle {
            negotiator,
            script: Mutex::new(script),
            user_action: Mutex::new(trigger.action()),
            local: self.local,
            cursors: Arc::clone(&self.cursors),
            flavor_notifications: Arc::clone(&self.flavor_notifications),
        }))
    }

    fn drag_threshold(&self) -> Option<f64> {
        self.threshold
    }
}

struct HeadlessHandle {
    negotiator: Arc<DragNegotiator>,
    script: Mutex<Vec<ScriptStep>>,
    user_action: Mutex<ActionMask>,
    local: bool,
    cursors: Arc<Mutex<Vec<DragCursor>>>,
    flavor_notifications: Arc<Mutex<usize>>,
}

#[derive(Clone, Copy)]
enum Crossing {
    Enter,
    Over,
    ActionChanged,
}

impl HeadlessHandle {
    fn bind(&self, bound: &mut Option<(Arc<DropGate>, Arc<HeadlessPeer>)>, gate: &Arc<DropGate>) -> Arc<HeadlessPeer> {
        if let Some((current, peer)) = bound.as_ref() {
            if Arc::ptr_eq(current, gate) {
                return Arc::clone(peer);
            }
        }
        if let Some((previous, _)) = bound.take() {
            previous.remove_notify();
        }
        let peer = Arc::new(HeadlessPeer::new(Arc::clone(self.negotiator.transferable()), self.local));
        gate.add_notify(peer.clone());
        *bound = Some((Arc::clone(gate), Arc::clone(&peer)));
        peer
    }

    fn cross(
        &self,
        crossing: Crossing,
        peer: &HeadlessPeer,
        gate: &DropGate,
        location: Point,
        user_action: ActionMask,
    ) -> DndResult<()> {
        *self.user_action.lock() = user_action;
        let source_actions = self.negotiator.source_actions();
        let context = Arc::clone(gate.drop_target_context());

        peer.begin_drag(if gate.is_active() { context.target_actions() } else { ActionMask::NONE });
        let event = DropTargetDragEvent::new(context, location, user_action & source_actions, source_actions);
        match crossing {
            Crossing::Enter => gate.drag_enter(Some(&event))?,
            Crossing::Over => gate.drag_over(Some(&event))?,
            Crossing::ActionChanged => gate.drop_action_changed(Some(&event))?,
        }

        let report = DragSourceDragEvent::new(user_action, peer.response()).at(location);
        match crossing {
            Crossing::Enter => {
                self.negotiator.on_mouse_moved(&report);
                self.negotiator.on_enter(&report)
            }
            Crossing::Over => {
                self.negotiator.on_mouse_moved(&report);
                self.negotiator.on_over(&report)
            }
            Crossing::ActionChanged => self.negotiator.on_action_changed(&report),
        }
    }

    fn finish_drop(&self, peer: &HeadlessPeer, gate: &DropGate, location: Point) -> DndResult<DropOutcome> {
        let user_action = *self.user_action.lock();
        let source_actions = self.negotiator.source_actions();
        let event = DropTargetDropEvent::new(
            Arc::clone(gate.drop_target_context()),
            location,
            user_action & source_actions,
            source_actions,
            self.local,
        );
        gate.drop_event(Some(&event))?;

        let (success, action) = peer.drop_result();
        let action = action & source_actions;
        let mut report = DragSourceDropEvent::new(success && !action.is_empty(), action);
        report.location = Some(location);
        self.negotiator.on_drop(&report)?;
        Ok(DropOutcome::from(&report))
    }
}

impl OperationHandle for HeadlessHandle {
    fn run(&self, cursor: &DragCursor) -> DndResult<DropOutcome> {
        self.cursors.lock().push(cursor.clone());
        let script = std::mem::take(&mut *self.script.lock());
        let mut bound: Option<(Arc<DropGate>, Arc<HeadlessPeer>)> = None;

        for step in script {
            match step {
                ScriptStep::Motion { location, user_action } => {
                    *self.user_action.lock() = user_action;
                    let target = bound.as_ref().map(|(_, peer)| peer.response()).unwrap_or(ActionMask::NONE);
                    self.negotiator
                        .on_mouse_moved(&DragSourceDragEvent::new(user_action, target).at(location));
                }
                ScriptStep::Enter {
                    gate,
                    location,
                    user_action,
                } => {
                    let peer = self.bind(&mut bound, &gate);
                    self.cross(Crossing::Enter, &peer, &gate, location, user_action)?;
                }
                ScriptStep::Over {
                    gate,
                    location,
                    user_action,
                } => {
                    let peer = self.bind(&mut bound, &gate);
                    self.cross(Crossing::Over, &peer, &gate, location, user_action)?;
                }
                ScriptStep::ActionChanged {
                    gate,
                    location,
                    user_action,
                } => {
                    let peer = self.bind(&mut bound, &gate);
                    self.cross(Crossing::ActionChanged, &peer, &gate, location, user_action)?;
                }
                ScriptStep::Exit { gate } => {
                    gate.drag_exit(Some(&DropTargetEvent::new(Arc::clone(gate.drop_target_context()))))?;
                    gate.remove_notify();
                    bound = None;
                    self.negotiator.on_exit(&DragSourceEvent::default())?;
                }
                ScriptStep::Drop { gate, location } => {
                    let peer = self.bind(&mut bound, &gate);
                    let outcome = self.finish_drop(&peer, &gate, location);
                    gate.remove_notify();
                    return outcome;
                }
                ScriptStep::Abort(reason) => {
                    if let Some((gate, _)) = bound.take() {
                        gate.remove_notify();
                    }
                    return Err(DndError::Bridge(reason));
                }
            }
        }

        if let Some((gate, _)) = bound.take() {
            gate.drag_exit(Some(&DropTargetEvent::new(Arc::clone(gate.drop_target_context()))))?;
            gate.remove_notify();
            self.negotiator.on_exit(&DragSourceEvent::default())?;
        }
        let report = DragSourceDropEvent::new(false, ActionMask::NONE);
        self.negotiator.on_drop(&report)?;
        Ok(DropOutcome::from(&report))
    }

    fn set_cursor(&self, cursor: &DragCursor) {
        self.cursors.lock().push(cursor.clone());
    }

    fn notify_flavors_changed(&self) {
        *self.flavor_notifications.lock() += 1;
    }
}

struct PeerState {
    target_actions: ActionMask,
    /// What the listener answered for the current drag event.
    response: ActionMask,
    accepted_drop: Option<ActionMask>,
    completed: Option<bool>,
}

/// Records a target's answers for the headless drag loop.
struct HeadlessPeer {
    payload: Arc<dyn Transferable>,
    local: bool,
    state: Mutex<PeerState>,
}

impl HeadlessPeer {
    fn new(payload: Arc<dyn Transferable>, local: bool) -> Self {
        Self {
            payload,
            local,
            state: Mutex::new(PeerState {
                target_actions: ActionMask::NONE,
                response: ActionMask::NONE,
                accepted_drop: None,
                completed: None,
            }),
        }
    }

    /// Without an explicit answer a target accepts its configured actions.
    fn begin_drag(&self, accepted: ActionMask) {
        let mut state = self.state.lock();
        state.target_actions = accepted;
        state.response = accepted;
    }

    fn response(&self) -> ActionMask {
        self.state.lock().response
    }

    fn drop_result(&self) -> (bool, ActionMask) {
        let state = self.state.lock();
        match (state.accepted_drop, state.completed) {
            (Some(action), Some(true)) => (true, action),
            _ => (false, ActionMask::NONE),
        }
    }
}

impl DropTargetPeer for HeadlessPeer {
    fn set_target_actions(&self, actions: ActionMask) {
        self.state.lock().target_actions = actions;
    }

    fn accept_drag(&self, action: ActionMask) {
        self.state.lock().response = action;
    }

    fn reject_drag(&self) {
        self.state.lock().response = ActionMask::NONE;
    }

    fn accept_drop(&self, action: ActionMask) {
        self.state.lock().accepted_drop = Some(action);
    }

    fn reject_drop(&self) {
        self.state.lock().accepted_drop = None;
    }

    fn drop_complete(&self, success: bool) {
        self.state.lock().completed = Some(success);
    }

    fn transferable(&self) -> DndResult<Arc<dyn Transferable>> {
        Ok(Arc::clone(&self.payload))
    }

    fn is_transferable_local(&self) -> bool {
        self.local
    }
}
