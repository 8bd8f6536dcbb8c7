//! Target side of drag-and-drop.
//!
//! Every drop zone owns a [`DropGate`]. The platform bridge reports the
//! pointer crossing the zone to the gate, which forwards the notifications to
//! its single listener while active. Listeners answer through the
//! [`DropTargetContext`] carried by each event.

mod context;
mod events;

pub use context::{DropTargetContext, DropTargetPeer};
pub use events::{DropTargetDragEvent, DropTargetDropEvent, DropTargetEvent, DropTargetListener, TargetEvent};

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::action::ActionMask;
use crate::error::{DndError, DndResult};
use crate::input::Component;
use crate::subscription::Exclusive;
use crate::transfer::{FlavorMap, SystemFlavorMap};

struct GateState {
    component: Option<Weak<dyn Component>>,
    default_actions: ActionMask,
    active: bool,
    /// `None` selects the shared system map.
    flavor_map: Option<Arc<dyn FlavorMap>>,
}

/// Gatekeeper of one drop zone.
pub struct DropGate {
    state: Mutex<GateState>,
    listener: Exclusive<dyn DropTargetListener>,
    context: Arc<DropTargetContext>,
}

impl DropGate {
    /// Create a gate for `component` accepting `actions`.
    pub fn new(
        component: Option<&Arc<dyn Component>>,
        actions: ActionMask,
        listener: Option<Arc<dyn DropTargetListener>>,
        active: bool,
    ) -> DndResult<Arc<Self>> {
        let actions = ActionMask::from_bits_truncate(actions.bits());
        let gate = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            state: Mutex::new(GateState {
                component: component.map(Arc::downgrade),
                default_actions: actions,
                active,
                flavor_map: None,
            }),
            listener: Exclusive::new(),
            context: Arc::new(DropTargetContext::new(weak.clone(), actions)),
        });
        if let Some(listener) = listener {
            gate.add_listener(listener)?;
        }
        Ok(gate)
    }

    pub fn add_listener(&self, listener: Arc<dyn DropTargetListener>) -> DndResult<()> {
        if std::ptr::eq(Arc::as_ptr(&listener) as *const (), self as *const Self as *const ()) {
            return Err(DndError::SelfRegistration);
        }
        self.listener.add(listener)
    }

    pub fn remove_listener(&self, listener: Option<&Arc<dyn DropTargetListener>>) -> DndResult<()> {
        self.listener.remove(listener).map(|_| ())
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_set()
    }

    /// The zone's component, if it is still alive.
    pub fn component(&self) -> Option<Arc<dyn Component>> {
        self.state.lock().component.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_component(&self, component: Option<&Arc<dyn Component>>) {
        self.state.lock().component = component.map(Arc::downgrade);
    }

    pub fn default_actions(&self) -> ActionMask {
        self.state.lock().default_actions
    }

    /// Change the accepted actions. Unknown bits are dropped.
    pub fn set_default_actions(&self, actions: ActionMask) {
        let actions = ActionMask::from_bits_truncate(actions.bits());
        self.state.lock().default_actions = actions;
        self.context.set_target_actions(actions);
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Enable or disable the zone. Disabling unbinds any running drag.
    pub fn set_active(&self, active: bool) {
        self.state.lock().active = active;
        if !active {
            self.context.remove_notify();
        }
    }

    pub fn flavor_map(&self) -> Arc<dyn FlavorMap> {
        match &self.state.lock().flavor_map {
            Some(map) => Arc::clone(map),
            None => SystemFlavorMap::shared() as Arc<dyn FlavorMap>,
        }
    }

    /// Override the flavor map, or pass `None` to use the shared system map.
    pub fn set_flavor_map(&self, map: Option<Arc<dyn FlavorMap>>) {
        self.state.lock().flavor_map = map;
    }

    pub fn drop_target_context(&self) -> &Arc<DropTargetContext> {
        &self.context
    }

    /// A drag entered the zone's platform window.
    pub fn add_notify(&self, peer: Arc<dyn DropTargetPeer>) {
        self.context.add_notify(peer);
    }

    pub fn remove_notify(&self) {
        self.context.remove_notify();
    }

    pub fn drag_enter(&self, event: Option<&DropTargetDragEvent>) -> DndResult<()> {
        self.forward_drag(DragPhase::Enter, event)
    }

    pub fn drag_over(&self, event: Option<&DropTargetDragEvent>) -> DndResult<()> {
        self.forward_drag(DragPhase::Over, event)
    }

    pub fn drop_action_changed(&self, event: Option<&DropTargetDragEvent>) -> DndResult<()> {
        self.forward_drag(DragPhase::ActionChanged, event)
    }

    /// A missing event is only an error when a listener would receive it.
    pub fn drag_exit(&self, event: Option<&DropTargetEvent>) -> DndResult<()> {
        let Some(Some(listener)) = self.receiver() else {
            return Ok(());
        };
        let event = event.ok_or(DndError::NullEvent("drag exit"))?;
        listener.on_event(TargetEvent::DragExit(event));
        Ok(())
    }

    /// The pointer was released over the zone. Consumed silently while inactive.
    pub fn drop_event(&self, event: Option<&DropTargetDropEvent>) -> DndResult<()> {
        let Some(Some(listener)) = self.receiver() else {
            return Ok(());
        };
        let event = event.ok_or(DndError::NullEvent("drop"))?;
        listener.on_event(TargetEvent::Drop(event));
        Ok(())
    }

    fn forward_drag(&self, phase: DragPhase, event: Option<&DropTargetDragEvent>) -> DndResult<()> {
        let Some(listener) = self.receiver() else {
            return Ok(());
        };
        let event = event.ok_or(DndError::NullEvent(phase.name()))?;
        if let Some(listener) = listener {
            listener.on_event(phase.wrap(event));
        }
        Ok(())
    }

    /// Snapshot of the dispatch route: `None` while inactive, otherwise the
    /// listener to notify. Read under the state lock so a concurrent
    /// deactivation is seen together with the listener it silences.
    ///
    /// A gate whose component has been torn down releases its listener and
    /// ignores further notifications.
    fn receiver(&self) -> Option<Option<Arc<dyn DropTargetListener>>> {
        let state = self.state.lock();
        if !state.active {
            return None;
        }
        if state.component.as_ref().is_some_and(|c| c.strong_count() == 0) {
            if self.listener.clear().is_some() {
                log::debug!("Drop zone component is gone, released its listener");
            }
            return None;
        }
        Some(self.listener.get())
    }
}

impl DropTargetListener for DropGate {
    fn on_event(&self, event: TargetEvent<'_>) {
        let result = match event {
            TargetEvent::DragEnter(e) => self.drag_enter(Some(e)),
            TargetEvent::DragOver(e) => self.drag_over(Some(e)),
            TargetEvent::DropActionChanged(e) => self.drop_action_changed(Some(e)),
            TargetEvent::DragExit(e) => self.drag_exit(Some(e)),
            TargetEvent::Drop(e) => self.drop_event(Some(e)),
        };
        if let Err(e) = result {
            log::warn!("Drop gate rejected {}: {}", event.name(), e);
        }
    }
}

impl fmt::Debug for DropGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DropGate")
            .field("default_actions", &state.default_actions)
            .field("active", &state.active)
            .field("listener", &self.listener.is_set())
            .finish()
    }
}

#[derive(Clone, Copy)]
enum DragPhase {
    Enter,
    Over,
    ActionChanged,
}

impl DragPhase {
    fn name(self) -> &'static str {
        match self {
            DragPhase::Enter => "drag enter",
            DragPhase::Over => "drag over",
            DragPhase::ActionChanged => "drop action changed",
        }
    }

    fn wrap(self, event: &DropTargetDragEvent) -> TargetEvent<'_> {
        match self {
            DragPhase::Enter => TargetEvent::DragEnter(event),
            DragPhase::Over => TargetEvent::DragOver(event),
            DragPhase::ActionChanged => TargetEvent::DropActionChanged(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;
    use crate::headless::HeadlessComponent;
    use crate::transfer::{DataFlavor, TransferBundle, TransferData, Transferable};

    #[derive(Default)]
    struct RecordingPeer {
        calls: Mutex<Vec<String>>,
    }

    impl DropTargetPeer for RecordingPeer {
        fn set_target_actions(&self, actions: ActionMask) {
            self.calls.lock().push(format!("actions {:?}", actions.bits()));
        }
        fn accept_drag(&self, action: ActionMask) {
            self.calls.lock().push(format!("accept drag {:?}", action.bits()));
        }
        fn reject_drag(&self) {
            self.calls.lock().push("reject drag".into());
        }
        fn accept_drop(&self, action: ActionMask) {
            self.calls.lock().push(format!("accept drop {:?}", action.bits()));
        }
        fn reject_drop(&self) {
            self.calls.lock().push("reject drop".into());
        }
        fn drop_complete(&self, success: bool) {
            self.calls.lock().push(format!("complete {}", success));
        }
        fn transferable(&self) -> DndResult<Arc<dyn Transferable>> {
            Ok(Arc::new(TransferBundle::text("hello")))
        }
        fn is_transferable_local(&self) -> bool {
            true
        }
    }

    fn recorder() -> (Arc<dyn DropTargetListener>, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let listener: Arc<dyn DropTargetListener> = Arc::new(move |event: TargetEvent<'_>| {
            sink.lock().push(event.name());
        });
        (listener, log)
    }

    fn gate(active: bool, listener: Option<Arc<dyn DropTargetListener>>) -> Arc<DropGate> {
        DropGate::new(None, ActionMask::COPY_OR_MOVE, listener, active).unwrap()
    }

    fn drag_event(gate: &DropGate) -> DropTargetDragEvent {
        DropTargetDragEvent::new(
            Arc::clone(gate.drop_target_context()),
            Point::new(1.0, 2.0),
            ActionMask::MOVE,
            ActionMask::COPY_OR_MOVE,
        )
    }

    #[test]
    fn test_one_listener_discipline() {
        let (first, _) = recorder();
        let (second, _) = recorder();
        let gate = gate(true, Some(first.clone()));
        assert_eq!(gate.add_listener(second.clone()), Err(DndError::ListenerAlreadyPresent));
        assert_eq!(gate.remove_listener(Some(&second)), Err(DndError::ListenerMismatch));
        assert_eq!(gate.remove_listener(None), Ok(()));
        assert!(gate.has_listener());
        assert_eq!(gate.remove_listener(Some(&first)), Ok(()));
        assert_eq!(gate.remove_listener(Some(&first)), Ok(()));
        assert_eq!(gate.add_listener(second), Ok(()));
    }

    #[test]
    fn test_self_registration_rejected() {
        let gate = gate(true, None);
        let as_listener: Arc<dyn DropTargetListener> = gate.clone();
        assert_eq!(gate.add_listener(as_listener), Err(DndError::SelfRegistration));
        assert!(!gate.has_listener());
    }

    #[test]
    fn test_inactive_gate_ignores_missing_events() {
        let (listener, log) = recorder();
        let gate = gate(false, Some(listener));
        assert_eq!(gate.drag_enter(None), Ok(()));
        assert_eq!(gate.drag_over(None), Ok(()));
        assert_eq!(gate.drop_action_changed(None), Ok(()));
        assert_eq!(gate.drag_exit(None), Ok(()));
        assert_eq!(gate.drop_event(None), Ok(()));

        let event = drag_event(&gate);
        gate.drag_enter(Some(&event)).unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_active_gate_rejects_missing_drag_events() {
        let gate = gate(true, None);
        assert_eq!(gate.drag_enter(None), Err(DndError::NullEvent("drag enter")));
        assert_eq!(gate.drag_over(None), Err(DndError::NullEvent("drag over")));
        assert_eq!(gate.drop_action_changed(None), Err(DndError::NullEvent("drop action changed")));
    }

    #[test]
    fn test_exit_and_drop_need_event_only_with_listener() {
        let gate = gate(true, None);
        assert_eq!(gate.drag_exit(None), Ok(()));
        assert_eq!(gate.drop_event(None), Ok(()));

        let (listener, _) = recorder();
        gate.add_listener(listener).unwrap();
        assert_eq!(gate.drag_exit(None), Err(DndError::NullEvent("drag exit")));
        assert_eq!(gate.drop_event(None), Err(DndError::NullEvent("drop")));
    }

    #[test]
    fn test_forwards_events_in_order() {
        let (listener, log) = recorder();
        let gate = gate(true, Some(listener));
        let context = Arc::clone(gate.drop_target_context());
        let event = drag_event(&gate);
        gate.drag_enter(Some(&event)).unwrap();
        gate.drag_over(Some(&event)).unwrap();
        gate.drop_action_changed(Some(&event)).unwrap();
        gate.drag_exit(Some(&DropTargetEvent::new(context.clone()))).unwrap();
        gate.drop_event(Some(&DropTargetDropEvent::new(
            context,
            Point::ZERO,
            ActionMask::MOVE,
            ActionMask::COPY_OR_MOVE,
            true,
        )))
        .unwrap();
        assert_eq!(
            *log.lock(),
            vec!["drag enter", "drag over", "drop action changed", "drag exit", "drop"]
        );
    }

    #[test]
    fn test_gate_as_listener_routes_to_its_own_listener() {
        let (listener, log) = recorder();
        let gate = gate(true, Some(listener));
        let event = drag_event(&gate);
        gate.on_event(TargetEvent::DragOver(&event));
        assert_eq!(*log.lock(), vec!["drag over"]);
    }

    #[test]
    fn test_default_actions_are_masked_and_pushed() {
        let gate = gate(true, None);
        let peer = Arc::new(RecordingPeer::default());
        gate.set_default_actions(ActionMask::from_bits_retain(0x8000_0000 | ActionMask::COPY.bits()));
        assert_eq!(gate.default_actions(), ActionMask::COPY);
        assert!(peer.calls.lock().is_empty());

        gate.add_notify(peer.clone());
        assert_eq!(gate.drop_target_context().target_actions(), ActionMask::COPY);
        gate.set_default_actions(ActionMask::LINK);
        assert_eq!(
            *peer.calls.lock(),
            vec![
                format!("actions {:?}", ActionMask::COPY.bits()),
                format!("actions {:?}", ActionMask::LINK.bits()),
            ]
        );
    }

    #[test]
    fn test_context_requires_peer() {
        let gate = gate(true, None);
        let context = gate.drop_target_context();
        assert_eq!(context.accept_drag(ActionMask::COPY), Err(DndError::NotBound));
        assert_eq!(context.drop_complete(true), Err(DndError::NotBound));
        assert!(context.transferable().is_err());

        let peer = Arc::new(RecordingPeer::default());
        gate.add_notify(peer.clone());
        let event = drag_event(&gate);
        event.accept_drag(ActionMask::MOVE).unwrap();
        event.reject_drag().unwrap();
        assert!(event.is_flavor_supported(&DataFlavor::plain_text()).unwrap());
        assert_eq!(event.current_flavors().unwrap(), vec![DataFlavor::plain_text()]);

        let proxy = event.transferable().unwrap();
        assert!(proxy.is_local());
        match proxy.fetch(&DataFlavor::plain_text()).unwrap() {
            TransferData::Text(text) => assert_eq!(text, "hello"),
            other => panic!("unexpected data {:?}", other),
        }
        assert_eq!(peer.calls.lock()[1..], [format!("accept drag {:?}", ActionMask::MOVE.bits()), "reject drag".to_string()]);
    }

    #[test]
    fn test_deactivating_unbinds_peer() {
        let gate = gate(true, None);
        gate.add_notify(Arc::new(RecordingPeer::default()));
        assert!(gate.drop_target_context().is_bound());
        gate.set_active(false);
        assert!(!gate.drop_target_context().is_bound());
        assert!(!gate.is_active());
    }

    #[test]
    fn test_component_is_weak() {
        let component: Arc<dyn Component> = Arc::new(HeadlessComponent::new());
        let gate = DropGate::new(Some(&component), ActionMask::COPY, None, true).unwrap();
        assert_eq!(gate.component().map(|c| c.id()), Some(component.id()));
        drop(component);
        assert!(gate.component().is_none());
    }

    #[test]
    fn test_torn_down_component_releases_listener() {
        let component: Arc<dyn Component> = Arc::new(HeadlessComponent::new());
        let (listener, log) = recorder();
        let gate = DropGate::new(Some(&component), ActionMask::COPY, Some(listener), true).unwrap();
        let event = drag_event(&gate);
        gate.drag_enter(Some(&event)).unwrap();
        assert_eq!(*log.lock(), vec!["drag enter"]);

        drop(component);
        assert_eq!(gate.drag_over(Some(&event)), Ok(()));
        assert_eq!(gate.drop_event(None), Ok(()));
        assert!(!gate.has_listener());
        assert_eq!(*log.lock(), vec!["drag enter"]);
    }

    #[test]
    fn test_gate_without_component_keeps_listener() {
        let (listener, log) = recorder();
        let gate = gate(true, Some(listener));
        let event = drag_event(&gate);
        gate.drag_over(Some(&event)).unwrap();
        assert!(gate.has_listener());
        assert_eq!(*log.lock(), vec!["drag over"]);
    }

    #[test]
    fn test_deactivation_races_with_dispatch() {
        let (listener, log) = recorder();
        let gate = gate(true, Some(listener));
        let event = drag_event(&gate);

        let toggler = {
            let gate = gate.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    gate.set_active(i % 2 == 0);
                }
                gate.set_active(false);
            })
        };
        for _ in 0..500 {
            gate.drag_over(Some(&event)).unwrap();
        }
        toggler.join().unwrap();

        let seen = log.lock().len();
        gate.drag_over(Some(&event)).unwrap();
        gate.drop_event(None).unwrap();
        assert_eq!(log.lock().len(), seen);
        assert!(gate.has_listener());
    }

    #[test]
    fn test_flavor_map_override() {
        let gate = gate(true, None);
        let shared: Arc<dyn FlavorMap> = SystemFlavorMap::shared();
        assert!(crate::input::same_object(&gate.flavor_map(), &shared));

        let custom: Arc<dyn FlavorMap> = Arc::new(SystemFlavorMap::default());
        gate.set_flavor_map(Some(custom.clone()));
        assert!(crate::input::same_object(&gate.flavor_map(), &custom));
        gate.set_flavor_map(None);
        assert!(crate::input::same_object(&gate.flavor_map(), &shared));
    }

    #[test]
    fn test_context_points_back_to_gate() {
        let gate = gate(true, None);
        let back = gate.drop_target_context().drop_gate().unwrap();
        assert!(Arc::ptr_eq(&back, &gate));
    }
}
