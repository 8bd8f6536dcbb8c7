//! Source-side negotiation of one running drag operation.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use scopeguard::defer;

use super::cursor::{DragCursor, Status};
use super::events::{
    DragSourceDragEvent, DragSourceDropEvent, DragSourceEvent, DragSourceListener, DropOutcome, SourceEvent,
};
use super::slot::{OperationGuard, OperationId};
use super::DragSource;
use crate::action::ActionMask;
use crate::bridge::OperationHandle;
use crate::error::DndResult;
use crate::gesture::DragGesture;
use crate::input::Component;
use crate::transfer::Transferable;

struct NegotiationState {
    /// Actions the source currently offers. Narrowed by action changes.
    source_actions: ActionMask,
    /// Actions the target under the pointer last reported.
    target_actions: ActionMask,
    status: Status,
    /// Action the cursor feedback last settled on.
    current_action: ActionMask,
    cursor: DragCursor,
    /// Set while the client has pinned an explicit cursor.
    custom_cursor: bool,
    handle: Option<Arc<dyn OperationHandle>>,
    guard: Option<OperationGuard>,
}

/// Tracks one drag operation on the source side.
///
/// Receives the status callbacks reported by the platform bridge, keeps the
/// cursor feedback in sync with the negotiated action, and forwards every
/// callback to the operation's listener and to the drag source's listeners.
pub struct DragNegotiator {
    id: OperationId,
    trigger: DragGesture,
    payload: Arc<dyn Transferable>,
    listener: crate::subscription::Exclusive<dyn DragSourceListener>,
    state: Mutex<NegotiationState>,
    /// Serializes callback delivery. Re-entrant so listeners can call back in.
    dispatch: ReentrantMutex<()>,
}

impl DragNegotiator {
    /// Run a drag operation to completion.
    ///
    /// Fails with [`DndError::Busy`](crate::DndError::Busy) while another
    /// operation holds the drag source's slot. The slot is held until the
    /// platform bridge returns, on every exit path.
    pub fn start(
        trigger: DragGesture,
        cursor: Option<DragCursor>,
        payload: Arc<dyn Transferable>,
        listener: Option<Arc<dyn DragSourceListener>>,
    ) -> DndResult<DropOutcome> {
        let source = Arc::clone(trigger.drag_source());
        let guard = source.slot().try_acquire()?;
        trigger.validate()?;

        let negotiator = Arc::new(Self::new(guard, trigger, cursor, payload)?);
        defer! {
            negotiator.release();
        }
        if let Some(listener) = listener {
            negotiator.add_listener(listener)?;
        }

        log::info!(
            "Starting drag {:?} with {:?} (offered {:?})",
            negotiator.id.0,
            negotiator.trigger.action(),
            negotiator.trigger.source_actions()
        );
        let handle = source
            .bridge()
            .create_operation_handle(&negotiator.trigger, Arc::clone(&negotiator))?;
        negotiator.state.lock().handle = Some(Arc::clone(&handle));

        let outcome = handle.run(&negotiator.cursor());
        match &outcome {
            Ok(outcome) => log::info!("Drag {:?} finished: {:?}", negotiator.id.0, outcome),
            Err(e) => log::warn!("Drag {:?} failed: {}", negotiator.id.0, e),
        }
        outcome
    }

    fn new(
        guard: OperationGuard,
        trigger: DragGesture,
        cursor: Option<DragCursor>,
        payload: Arc<dyn Transferable>,
    ) -> DndResult<Self> {
        let source_actions = trigger.source_actions();
        let custom_cursor = cursor.is_some();
        let (current_action, computed) = DragCursor::feedback(source_actions, ActionMask::NONE, Status::Default)?;
        let cursor = cursor.unwrap_or(computed);

        Ok(Self {
            id: guard.id(),
            trigger,
            payload,
            listener: Default::default(),
            state: Mutex::new(NegotiationState {
                source_actions,
                target_actions: ActionMask::NONE,
                status: Status::Default,
                current_action,
                cursor,
                custom_cursor,
                handle: None,
                guard: Some(guard),
            }),
            dispatch: ReentrantMutex::new(()),
        })
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    /// The gesture that started the operation.
    pub fn trigger(&self) -> &DragGesture {
        &self.trigger
    }

    pub fn component(&self) -> Option<&Arc<dyn Component>> {
        self.trigger.component()
    }

    pub fn drag_source(&self) -> &Arc<DragSource> {
        self.trigger.drag_source()
    }

    /// The payload being dragged.
    pub fn transferable(&self) -> &Arc<dyn Transferable> {
        &self.payload
    }

    /// Actions currently offered by the source.
    pub fn source_actions(&self) -> ActionMask {
        self.state.lock().source_actions
    }

    /// Actions last reported by the target under the pointer.
    pub fn target_actions(&self) -> ActionMask {
        self.state.lock().target_actions
    }

    /// Action chosen by the last feedback computation.
    pub fn current_action(&self) -> ActionMask {
        self.state.lock().current_action
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    /// Cursor currently displayed.
    pub fn cursor(&self) -> DragCursor {
        self.state.lock().cursor.clone()
    }

    pub fn is_custom_cursor(&self) -> bool {
        self.state.lock().custom_cursor
    }

    /// Whether the operation still holds its slot.
    pub fn is_active(&self) -> bool {
        self.state.lock().guard.is_some()
    }

    pub fn add_listener(&self, listener: Arc<dyn DragSourceListener>) -> DndResult<()> {
        self.listener.add(listener)
    }

    pub fn remove_listener(&self, listener: Option<&Arc<dyn DragSourceListener>>) -> DndResult<()> {
        self.listener.remove(listener).map(|_| ())
    }

    /// Pin an explicit cursor, or pass `None` to return to computed feedback.
    pub fn set_cursor(&self, cursor: Option<DragCursor>) -> DndResult<()> {
        let _serial = self.dispatch.lock();
        match cursor {
            Some(cursor) => {
                let handle = {
                    let mut state = self.state.lock();
                    state.custom_cursor = true;
                    state.cursor = cursor.clone();
                    state.handle.clone()
                };
                if let Some(handle) = handle {
                    handle.set_cursor(&cursor);
                }
                Ok(())
            }
            None => {
                self.state.lock().custom_cursor = false;
                self.refresh_cursor()
            }
        }
    }

    pub fn on_enter(&self, event: &DragSourceDragEvent) -> DndResult<()> {
        let _serial = self.dispatch.lock();
        self.forward(SourceEvent::Enter(event));
        self.update_status(Status::Enter, event.target_actions)
    }

    pub fn on_over(&self, event: &DragSourceDragEvent) -> DndResult<()> {
        let _serial = self.dispatch.lock();
        self.forward(SourceEvent::Over(event));
        self.update_status(Status::Over, event.target_actions)
    }

    /// The user changed the requested action. Offered actions narrow to it.
    pub fn on_action_changed(&self, event: &DragSourceDragEvent) -> DndResult<()> {
        let _serial = self.dispatch.lock();
        self.state.lock().source_actions = self.trigger.source_actions() & event.drop_action();
        self.forward(SourceEvent::ActionChanged(event));
        self.update_status(Status::Changed, event.target_actions)
    }

    pub fn on_exit(&self, event: &DragSourceEvent) -> DndResult<()> {
        let _serial = self.dispatch.lock();
        self.forward(SourceEvent::Exit(event));
        self.update_status(Status::Exit, ActionMask::NONE)
    }

    /// Terminal callback. Frees the operation slot.
    pub fn on_drop(&self, event: &DragSourceDropEvent) -> DndResult<()> {
        let _serial = self.dispatch.lock();
        self.forward(SourceEvent::Drop(event));
        log::debug!("Drag {:?} dropped: {:?}", self.id.0, DropOutcome::from(event));
        let guard = self.state.lock().guard.take();
        drop(guard);
        Ok(())
    }

    /// Pointer moved during the operation.
    pub fn on_mouse_moved(&self, event: &DragSourceDragEvent) {
        let _serial = self.dispatch.lock();
        self.drag_source().notify_motion(event);
    }

    /// Tell the platform the payload's flavors changed.
    pub fn transferable_flavors_changed(&self) {
        let handle = self.state.lock().handle.clone();
        if let Some(handle) = handle {
            handle.notify_flavors_changed();
        }
    }

    fn forward(&self, event: SourceEvent<'_>) {
        if let Some(listener) = self.listener.get() {
            listener.on_event(self, event);
        }
        self.drag_source().notify(self, event);
    }

    fn update_status(&self, status: Status, target_actions: ActionMask) -> DndResult<()> {
        {
            let mut state = self.state.lock();
            state.status = status;
            state.target_actions = target_actions;
        }
        self.refresh_cursor()
    }

    fn refresh_cursor(&self) -> DndResult<()> {
        let (cursor, handle) = {
            let mut state = self.state.lock();
            let (action, cursor) = DragCursor::feedback(state.source_actions, state.target_actions, state.status)?;
            state.current_action = action;
            if state.custom_cursor || state.cursor == cursor {
                return Ok(());
            }
            state.cursor = cursor.clone();
            (cursor, state.handle.clone())
        };
        log::debug!("Drag {:?} cursor -> {}", self.id.0, cursor.name());
        if let Some(handle) = handle {
            handle.set_cursor(&cursor);
        }
        Ok(())
    }

    /// Detach from the platform and free the slot. Idempotent.
    fn release(&self) {
        let (guard, handle) = {
            let mut state = self.state.lock();
            (state.guard.take(), state.handle.take())
        };
        drop(handle);
        drop(guard);
    }
}

impl fmt::Debug for DragNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DragNegotiator")
            .field("id", &self.id)
            .field("source_actions", &state.source_actions)
            .field("target_actions", &state.target_actions)
            .field("status", &state.status)
            .field("cursor", &state.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;
    use crate::config::DndConfig;
    use crate::error::DndError;
    use crate::headless::{HeadlessBridge, HeadlessComponent};
    use crate::input::{Buttons, Modifiers, MouseButton, PointerEvent, PointerEventKind};
    use crate::source::OperationSlot;
    use crate::transfer::TransferBundle;

    fn gesture(source_actions: ActionMask) -> DragGesture {
        let source = DragSource::with_slot(
            Arc::new(HeadlessBridge::new()),
            Arc::new(OperationSlot::new()),
            DndConfig::default(),
        );
        let press = PointerEvent::new(
            PointerEventKind::Press(MouseButton::Left),
            Point::ZERO,
            Buttons::LEFT,
            Modifiers::default(),
        );
        DragGesture::new(
            source,
            Some(Arc::new(HeadlessComponent::new())),
            source_actions,
            source_actions.best_action(),
            Point::ZERO,
            vec![press],
        )
        .unwrap()
    }

    fn negotiator(source_actions: ActionMask) -> DragNegotiator {
        let trigger = gesture(source_actions);
        let guard = trigger.drag_source().slot().try_acquire().unwrap();
        DragNegotiator::new(guard, trigger, None, Arc::new(TransferBundle::text("x"))).unwrap()
    }

    fn recorder() -> (Arc<dyn DragSourceListener>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let listener: Arc<dyn DragSourceListener> = Arc::new(move |_n: &DragNegotiator, event: SourceEvent<'_>| {
            let name = match event {
                SourceEvent::Enter(_) => "enter",
                SourceEvent::Over(_) => "over",
                SourceEvent::ActionChanged(_) => "changed",
                SourceEvent::Exit(_) => "exit",
                SourceEvent::Drop(_) => "drop",
            };
            sink.lock().push(name.to_string());
        });
        (listener, log)
    }

    #[test]
    fn test_initial_cursor_is_no_drop() {
        let negotiator = negotiator(ActionMask::COPY_OR_MOVE);
        assert_eq!(negotiator.cursor(), DragCursor::MoveNoDrop);
        assert_eq!(negotiator.status(), Status::Default);
        assert!(negotiator.is_active());
    }

    #[test]
    fn test_over_with_overlap_enables_cursor() {
        let negotiator = negotiator(ActionMask::COPY_OR_MOVE);
        negotiator
            .on_over(&DragSourceDragEvent::new(ActionMask::MOVE, ActionMask::COPY))
            .unwrap();
        assert_eq!(negotiator.cursor(), DragCursor::CopyDrop);
        assert_eq!(negotiator.current_action(), ActionMask::COPY);
        assert_eq!(negotiator.target_actions(), ActionMask::COPY);
    }

    #[test]
    fn test_over_with_disjoint_target_disables_cursor() {
        let negotiator = negotiator(ActionMask::COPY_OR_MOVE);
        negotiator
            .on_over(&DragSourceDragEvent::new(ActionMask::MOVE, ActionMask::LINK))
            .unwrap();
        assert_eq!(negotiator.cursor(), DragCursor::MoveNoDrop);
        assert_eq!(negotiator.current_action(), ActionMask::MOVE);
    }

    #[test]
    fn test_exit_disables_cursor() {
        let negotiator = negotiator(ActionMask::COPY_OR_MOVE);
        negotiator
            .on_enter(&DragSourceDragEvent::new(ActionMask::MOVE, ActionMask::COPY_OR_MOVE))
            .unwrap();
        assert_eq!(negotiator.cursor(), DragCursor::MoveDrop);
        negotiator.on_exit(&DragSourceEvent::default()).unwrap();
        assert_eq!(negotiator.cursor(), DragCursor::MoveNoDrop);
        assert_eq!(negotiator.status(), Status::Exit);
    }

    #[test]
    fn test_action_change_narrows_source_actions() {
        let negotiator = negotiator(ActionMask::COPY_OR_MOVE);
        negotiator
            .on_action_changed(&DragSourceDragEvent::new(ActionMask::COPY, ActionMask::COPY_OR_MOVE))
            .unwrap();
        assert_eq!(negotiator.source_actions(), ActionMask::COPY);
        assert_eq!(negotiator.cursor(), DragCursor::CopyDrop);

        negotiator
            .on_action_changed(&DragSourceDragEvent::new(ActionMask::MOVE, ActionMask::COPY_OR_MOVE))
            .unwrap();
        assert_eq!(negotiator.source_actions(), ActionMask::MOVE);
        assert_eq!(negotiator.cursor(), DragCursor::MoveDrop);
    }

    #[test]
    fn test_pinned_cursor_is_kept() {
        let negotiator = negotiator(ActionMask::COPY_OR_MOVE);
        negotiator.set_cursor(Some(DragCursor::Named("grabbing".into()))).unwrap();
        negotiator
            .on_over(&DragSourceDragEvent::new(ActionMask::MOVE, ActionMask::COPY))
            .unwrap();
        assert_eq!(negotiator.cursor(), DragCursor::Named("grabbing".into()));
        assert!(negotiator.is_custom_cursor());

        negotiator.set_cursor(None).unwrap();
        assert_eq!(negotiator.cursor(), DragCursor::CopyDrop);
        assert!(!negotiator.is_custom_cursor());
    }

    #[test]
    fn test_listener_receives_every_callback_in_order() {
        let negotiator = negotiator(ActionMask::COPY_OR_MOVE);
        let (listener, log) = recorder();
        negotiator.add_listener(listener).unwrap();

        let event = DragSourceDragEvent::new(ActionMask::MOVE, ActionMask::MOVE);
        negotiator.on_enter(&event).unwrap();
        negotiator.on_over(&event).unwrap();
        negotiator.on_action_changed(&event).unwrap();
        negotiator.on_exit(&DragSourceEvent::default()).unwrap();
        negotiator.on_drop(&DragSourceDropEvent::new(false, ActionMask::NONE)).unwrap();

        assert_eq!(*log.lock(), vec!["enter", "over", "changed", "exit", "drop"]);
    }

    #[test]
    fn test_source_listeners_also_notified() {
        let negotiator = negotiator(ActionMask::COPY);
        let (listener, log) = recorder();
        negotiator.drag_source().add_drag_source_listener(listener);
        negotiator
            .on_enter(&DragSourceDragEvent::new(ActionMask::COPY, ActionMask::COPY))
            .unwrap();
        assert_eq!(*log.lock(), vec!["enter"]);
    }

    #[test]
    fn test_listener_discipline() {
        let negotiator = negotiator(ActionMask::COPY);
        let (first, _) = recorder();
        let (second, _) = recorder();
        negotiator.add_listener(first.clone()).unwrap();
        assert_eq!(negotiator.add_listener(second.clone()), Err(DndError::ListenerAlreadyPresent));
        assert_eq!(negotiator.remove_listener(Some(&second)), Err(DndError::ListenerMismatch));
        assert_eq!(negotiator.remove_listener(Some(&first)), Ok(()));
        assert_eq!(negotiator.add_listener(second), Ok(()));
    }

    #[test]
    fn test_listener_may_reenter() {
        let negotiator = negotiator(ActionMask::COPY_OR_MOVE);
        negotiator
            .add_listener(Arc::new(|n: &DragNegotiator, event: SourceEvent<'_>| {
                if let SourceEvent::Enter(_) = event {
                    n.set_cursor(Some(DragCursor::Named("busy".into()))).unwrap();
                }
            }))
            .unwrap();
        negotiator
            .on_enter(&DragSourceDragEvent::new(ActionMask::MOVE, ActionMask::MOVE))
            .unwrap();
        assert_eq!(negotiator.cursor(), DragCursor::Named("busy".into()));
    }

    #[test]
    fn test_drop_releases_slot() {
        let negotiator = negotiator(ActionMask::COPY);
        let slot = Arc::clone(negotiator.drag_source().slot());
        assert!(slot.is_busy());
        negotiator.on_drop(&DragSourceDropEvent::new(true, ActionMask::COPY)).unwrap();
        assert!(!slot.is_busy());
        assert!(!negotiator.is_active());
    }

    #[test]
    fn test_motion_fans_out_to_source() {
        let negotiator = negotiator(ActionMask::COPY);
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let sink = seen.clone();
            negotiator
                .drag_source()
                .add_motion_listener(Arc::new(move |e: &DragSourceDragEvent| sink.lock().push(e.location)));
        }
        negotiator.on_mouse_moved(&DragSourceDragEvent::new(ActionMask::COPY, ActionMask::NONE).at(Point::new(4.0, 2.0)));
        assert_eq!(*seen.lock(), vec![Some(Point::new(4.0, 2.0)); 2]);
    }
}
