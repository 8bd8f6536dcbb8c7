//! Dragkit Core Library
//!
//! Drag-and-drop protocol: gesture recognition, source-side negotiation with
//! cursor feedback, and target-side gating of drop notifications.

pub mod action;
pub mod bridge;
pub mod config;
pub mod error;
pub mod gesture;
pub mod headless;
pub mod input;
pub mod source;
pub mod subscription;
pub mod target;
pub mod transfer;

pub use action::ActionMask;
pub use bridge::{OperationHandle, PlatformBridge};
pub use config::{ConfigError, DndConfig, DEFAULT_DRAG_THRESHOLD, DRAG_THRESHOLD_ENV};
pub use error::{DndError, DndResult, ErrorKind};
pub use gesture::{DragGesture, DragGestureListener, GestureRecognizer, InputBinding, PointerDragRecognizer};
pub use input::{Buttons, Component, ComponentId, Modifiers, MouseButton, PointerEvent, PointerEventKind, PointerListener};
pub use source::{
    DragCursor, DragNegotiator, DragSource, DragSourceDragEvent, DragSourceDropEvent, DragSourceEvent,
    DragSourceListener, DragSourceMotionListener, DropOutcome, OperationId, OperationSlot, SourceEvent, Status,
};
pub use subscription::Exclusive;
pub use target::{
    DropGate, DropTargetContext, DropTargetDragEvent, DropTargetDropEvent, DropTargetEvent, DropTargetListener,
    DropTargetPeer, TargetEvent,
};
pub use transfer::{
    DataFlavor, FlavorMap, Representation, SerdeObject, SystemFlavorMap, TransferBundle, TransferData,
    TransferObject, TransferProxy, Transferable,
};
