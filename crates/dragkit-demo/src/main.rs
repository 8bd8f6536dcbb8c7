//! Runs one drag from pointer press to drop without a display.
//!
//! Usage: `dragkit-demo [config.json]`. Without a file, settings come from
//! the environment.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use dragkit_core::headless::{HeadlessBridge, HeadlessComponent, ScriptStep};
use dragkit_core::{
    ActionMask, Buttons, Component, DataFlavor, DndConfig, DndResult, DragGesture, DragNegotiator, DragSource,
    DragSourceListener, DropGate, DropTargetListener, Modifiers, MouseButton, OperationSlot, PointerEvent, PointerEventKind,
    SourceEvent, TargetEvent, TransferBundle, TransferData, Transferable,
};
use kurbo::Point;

fn load_config() -> DndConfig {
    match std::env::args().nth(1) {
        Some(path) => match DndConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Falling back to environment settings: {}", e);
                DndConfig::from_env()
            }
        },
        None => DndConfig::from_env(),
    }
}

fn card_flavor() -> DataFlavor {
    DataFlavor::object("Card")
}

/// Drop zone that takes cards and logs what it received.
fn card_gate() -> DndResult<Arc<DropGate>> {
    let listener: Arc<dyn DropTargetListener> = Arc::new(|event: TargetEvent<'_>| match event {
        TargetEvent::DragEnter(drag) | TargetEvent::DragOver(drag) => {
            let supported = drag.is_flavor_supported(&card_flavor()).unwrap_or(false);
            let result = if supported { drag.accept_drag(drag.drop_action()) } else { drag.reject_drag() };
            if let Err(e) = result {
                log::warn!("Could not answer drag: {}", e);
            }
        }
        TargetEvent::Drop(drop) => {
            let received = drop
                .transferable()
                .and_then(|payload| payload.fetch(&card_flavor()));
            let success = match received {
                Ok(TransferData::Object(object)) => {
                    log::info!("Received {:?} (local: {})", object, drop.is_local_transfer());
                    drop.accept_drop(drop.drop_action()).is_ok()
                }
                Ok(other) => {
                    log::warn!("Unexpected data {:?}", other);
                    false
                }
                Err(e) => {
                    log::warn!("Fetch failed: {}", e);
                    false
                }
            };
            if let Err(e) = drop.drop_complete(success) {
                log::warn!("Could not complete drop: {}", e);
            }
        }
        other => log::debug!("Target saw {}", other.name()),
    });
    DropGate::new(None, ActionMask::COPY_OR_MOVE, Some(listener), true)
}

fn pointer(kind: PointerEventKind, x: f64, y: f64, buttons: Buttons) -> PointerEvent {
    PointerEvent::new(kind, Point::new(x, y), buttons, Modifiers::default()).with_screen_position(Point::new(x, y))
}

fn run() -> DndResult<()> {
    let config = load_config();
    let bridge = Arc::new(HeadlessBridge::new());
    let source = DragSource::with_slot(bridge.clone(), OperationSlot::global(), config);
    log::info!("Drag threshold is {}", source.drag_threshold());

    let gate = card_gate()?;
    bridge.set_script(vec![
        ScriptStep::Enter {
            gate: gate.clone(),
            location: Point::new(200.0, 40.0),
            user_action: ActionMask::MOVE,
        },
        ScriptStep::Over {
            gate: gate.clone(),
            location: Point::new(210.0, 45.0),
            user_action: ActionMask::MOVE,
        },
        ScriptStep::ActionChanged {
            gate: gate.clone(),
            location: Point::new(210.0, 45.0),
            user_action: ActionMask::COPY,
        },
        ScriptStep::Drop {
            gate,
            location: Point::new(212.0, 46.0),
        },
    ]);

    let card = serde_json::json!({ "title": "Write demo", "tags": ["dnd", "headless"] });
    let payload = Arc::new(TransferBundle::new().with(card_flavor(), TransferData::object(card)));

    let component = Arc::new(HeadlessComponent::new());
    let _recognizer = source.create_recognizer(
        Some(component.clone() as Arc<dyn Component>),
        ActionMask::COPY_OR_MOVE,
        Some(Arc::new(move |gesture: DragGesture| -> DndResult<()> {
            log::info!("Recognized {:?}", gesture);
            let progress: Arc<dyn DragSourceListener> = Arc::new(|n: &DragNegotiator, event: SourceEvent<'_>| {
                log::info!("{:?} -> cursor {}", event, n.cursor().name());
            });
            let outcome = gesture.start_drag(None, payload.clone(), Some(progress))?;
            log::info!("Drag finished: {:?}", outcome);
            Ok(())
        })),
    )?;

    component.dispatch(&pointer(PointerEventKind::Press(MouseButton::Left), 10.0, 10.0, Buttons::LEFT));
    component.dispatch(&pointer(PointerEventKind::Drag, 12.0, 11.0, Buttons::LEFT));
    component.dispatch(&pointer(PointerEventKind::Drag, 30.0, 14.0, Buttons::LEFT));

    log::info!("Cursors shown: {:?}", bridge.cursor_log());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting dragkit demo");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Demo failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
