//! Pointer-driven drag recognizer.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{DragGestureListener, GestureRecognizer, InputBinding};
use crate::action::ActionMask;
use crate::config::DEFAULT_DRAG_THRESHOLD;
use crate::error::DndResult;
use crate::input::{Component, PointerEvent, PointerEventKind, PointerListener};
use crate::source::DragSource;

/// Recognizes a drag from press-and-move pointer input.
///
/// A press starts accumulating. Moving farther than the drag threshold along
/// either axis fires the gesture, with the action taken from the modifier
/// keys. Releasing first abandons it.
pub struct PointerDragRecognizer {
    core: GestureRecognizer,
    threshold: Mutex<f64>,
}

impl PointerDragRecognizer {
    pub fn new(
        source: Arc<DragSource>,
        component: Option<Arc<dyn Component>>,
        source_actions: ActionMask,
        listener: Option<Arc<dyn DragGestureListener>>,
    ) -> DndResult<Arc<Self>> {
        let recognizer = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            core: GestureRecognizer::new(
                source,
                component,
                source_actions,
                Box::new(PointerBinding {
                    recognizer: weak.clone(),
                }),
            ),
            threshold: Mutex::new(DEFAULT_DRAG_THRESHOLD),
        });
        if let Some(listener) = listener {
            recognizer.core.add_listener(listener)?;
        }
        Ok(recognizer)
    }

    /// The shared recognizer state: listener, component, accumulated events.
    pub fn recognizer(&self) -> &GestureRecognizer {
        &self.core
    }

    /// Threshold captured at the last press.
    pub fn threshold(&self) -> f64 {
        *self.threshold.lock()
    }

    fn action_for(&self, event: &PointerEvent) -> ActionMask {
        ActionMask::from_modifiers(event.modifiers, event.buttons, self.core.source_actions())
    }

    fn pressed(&self, event: &PointerEvent) {
        self.core.clear();
        if self.action_for(event).is_empty() {
            return;
        }
        *self.threshold.lock() = self.core.drag_source().drag_threshold();
        self.core.append(Some(event.clone()));
    }

    fn dragged(&self, event: &PointerEvent) {
        let Some(trigger) = self.core.trigger_event() else {
            return;
        };
        let action = self.action_for(event);
        if action.is_empty() {
            return;
        }

        let delta = event.delta_from(trigger.position);
        let threshold = self.threshold();
        if delta.x.abs() > threshold || delta.y.abs() > threshold {
            log::debug!("Drag gesture recognized with {:?} after {:?}", action, delta);
            if let Err(e) = self.core.fire_recognized(action, trigger.screen_position) {
                log::warn!("Discarding drag gesture: {}", e);
            }
        } else {
            self.core.append(Some(event.clone()));
        }
    }

    fn exited(&self, event: &PointerEvent) {
        if self.core.trigger_event().is_some() && self.action_for(event).is_empty() {
            self.core.clear();
        }
    }
}

impl PointerListener for PointerDragRecognizer {
    fn on_pointer(&self, event: &PointerEvent) {
        match event.kind {
            PointerEventKind::Press(_) => self.pressed(event),
            PointerEventKind::Drag => self.dragged(event),
            PointerEventKind::Release(_) | PointerEventKind::Enter => self.core.clear(),
            PointerEventKind::Exit => self.exited(event),
            PointerEventKind::Move => {}
        }
    }
}

struct PointerBinding {
    recognizer: Weak<PointerDragRecognizer>,
}

impl PointerBinding {
    fn listener(&self) -> Option<Arc<dyn PointerListener>> {
        self.recognizer.upgrade().map(|r| r as Arc<dyn PointerListener>)
    }
}

impl InputBinding for PointerBinding {
    fn register(&self, component: &Arc<dyn Component>) {
        if let Some(listener) = self.listener() {
            component.add_pointer_listener(listener);
        }
    }

    fn unregister(&self, component: &Arc<dyn Component>) {
        if let Some(listener) = self.listener() {
            component.remove_pointer_listener(&listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;
    use crate::config::DndConfig;
    use crate::error::DndError;
    use crate::gesture::DragGesture;
    use crate::headless::{HeadlessBridge, HeadlessComponent};
    use crate::input::{Buttons, Modifiers, MouseButton};
    use crate::source::OperationSlot;

    struct Fixture {
        component: Arc<HeadlessComponent>,
        recognizer: Arc<PointerDragRecognizer>,
        fired: Arc<Mutex<Vec<DragGesture>>>,
    }

    fn fixture(threshold: Option<f64>) -> Fixture {
        let bridge = Arc::new(HeadlessBridge::new());
        let source = DragSource::with_slot(
            bridge,
            Arc::new(OperationSlot::new()),
            DndConfig { drag_threshold: threshold },
        );
        let component = Arc::new(HeadlessComponent::new());
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        let recognizer = PointerDragRecognizer::new(
            source,
            Some(component.clone() as Arc<dyn Component>),
            ActionMask::all(),
            Some(Arc::new(move |gesture: DragGesture| -> DndResult<()> {
                sink.lock().push(gesture);
                Ok(())
            })),
        )
        .unwrap();
        Fixture {
            component,
            recognizer,
            fired,
        }
    }

    fn event(kind: PointerEventKind, x: f64, y: f64, buttons: Buttons, modifiers: Modifiers) -> PointerEvent {
        PointerEvent::new(kind, Point::new(x, y), buttons, modifiers).with_screen_position(Point::new(x + 100.0, y + 100.0))
    }

    fn press(x: f64, y: f64) -> PointerEvent {
        event(PointerEventKind::Press(MouseButton::Left), x, y, Buttons::LEFT, Modifiers::default())
    }

    fn drag(x: f64, y: f64) -> PointerEvent {
        event(PointerEventKind::Drag, x, y, Buttons::LEFT, Modifiers::default())
    }

    #[test]
    fn test_registers_with_component() {
        let f = fixture(None);
        assert_eq!(f.component.listener_count(), 1);
        assert!(f.recognizer.recognizer().component().is_some());
    }

    #[test]
    fn test_fires_after_threshold() {
        let f = fixture(Some(5.0));
        f.component.dispatch(&press(10.0, 10.0));
        f.component.dispatch(&drag(12.0, 11.0));
        assert!(f.fired.lock().is_empty());
        assert_eq!(f.recognizer.recognizer().events().len(), 2);

        f.component.dispatch(&drag(16.0, 10.0));
        let fired = f.fired.lock();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].action(), ActionMask::MOVE);
        assert_eq!(fired[0].origin(), Point::new(110.0, 110.0));
        assert_eq!(fired[0].events().len(), 2);
        assert!(f.recognizer.recognizer().events().is_empty());
    }

    #[test]
    fn test_threshold_is_per_axis() {
        let f = fixture(Some(5.0));
        f.component.dispatch(&press(0.0, 0.0));
        // 4.5 on both axes is farther than 5 in distance but within 5 per axis.
        f.component.dispatch(&drag(4.5, 4.5));
        assert!(f.fired.lock().is_empty());
        f.component.dispatch(&drag(0.0, 5.5));
        assert_eq!(f.fired.lock().len(), 1);
    }

    #[test]
    fn test_release_abandons_gesture() {
        let f = fixture(Some(5.0));
        f.component.dispatch(&press(0.0, 0.0));
        f.component.dispatch(&event(
            PointerEventKind::Release(MouseButton::Left),
            1.0,
            1.0,
            Buttons::empty(),
            Modifiers::default(),
        ));
        assert!(f.recognizer.recognizer().events().is_empty());
        f.component.dispatch(&drag(50.0, 50.0));
        assert!(f.fired.lock().is_empty());
    }

    #[test]
    fn test_modifiers_choose_action() {
        let f = fixture(Some(5.0));
        let ctrl = Modifiers {
            ctrl: true,
            ..Default::default()
        };
        f.component.dispatch(&event(PointerEventKind::Press(MouseButton::Left), 0.0, 0.0, Buttons::LEFT, ctrl));
        f.component.dispatch(&event(PointerEventKind::Drag, 20.0, 0.0, Buttons::LEFT, ctrl));
        assert_eq!(f.fired.lock()[0].action(), ActionMask::COPY);
    }

    #[test]
    fn test_press_with_two_buttons_is_ignored() {
        let f = fixture(Some(5.0));
        f.component.dispatch(&event(
            PointerEventKind::Press(MouseButton::Right),
            0.0,
            0.0,
            Buttons::LEFT | Buttons::RIGHT,
            Modifiers::default(),
        ));
        assert!(f.recognizer.recognizer().events().is_empty());
    }

    #[test]
    fn test_threshold_comes_from_source() {
        let f = fixture(Some(12.0));
        f.component.dispatch(&press(0.0, 0.0));
        assert_eq!(f.recognizer.threshold(), 12.0);
        f.component.dispatch(&drag(10.0, 0.0));
        assert!(f.fired.lock().is_empty());
    }

    #[test]
    fn test_exit_keeps_gesture_while_button_held() {
        let f = fixture(Some(5.0));
        f.component.dispatch(&press(0.0, 0.0));
        f.component.dispatch(&event(PointerEventKind::Exit, 2.0, 0.0, Buttons::LEFT, Modifiers::default()));
        assert_eq!(f.recognizer.recognizer().events().len(), 1);
        f.component.dispatch(&event(PointerEventKind::Exit, 2.0, 0.0, Buttons::empty(), Modifiers::default()));
        assert!(f.recognizer.recognizer().events().is_empty());
    }

    #[test]
    fn test_removing_listener_unregisters() {
        let f = fixture(None);
        let other: Arc<dyn DragGestureListener> = Arc::new(|_g: DragGesture| -> DndResult<()> { Ok(()) });
        assert_eq!(
            f.recognizer.recognizer().remove_listener(Some(&other)),
            Err(DndError::ListenerMismatch)
        );
        assert_eq!(f.component.listener_count(), 1);

        f.recognizer.recognizer().set_component(None);
        assert_eq!(f.component.listener_count(), 0);
    }

    #[test]
    fn test_component_and_recognizer_are_freed() {
        let f = fixture(None);
        let component = Arc::downgrade(&f.component);
        let recognizer = Arc::downgrade(&f.recognizer);
        assert_eq!(f.component.listener_count(), 1);

        drop(f);
        assert!(component.upgrade().is_none());
        assert!(recognizer.upgrade().is_none());
    }

    #[test]
    fn test_recognizer_does_not_keep_component_alive() {
        let f = fixture(None);
        let Fixture { component, recognizer, .. } = f;
        let weak = Arc::downgrade(&component);

        drop(component);
        assert!(weak.upgrade().is_none());
        assert!(recognizer.recognizer().component().is_none());
    }
}
