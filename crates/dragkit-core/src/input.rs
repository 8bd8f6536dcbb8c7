//! Pointer input consumed by gesture recognizers.
//!
//! The window system owns components and delivers raw pointer events to the
//! listeners registered on them. Only the narrow surface the recognizers need
//! is modelled here.

use std::sync::Arc;

use bitflags::bitflags;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a component owned by the window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub Uuid);

impl ComponentId {
    /// Create a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

bitflags! {
    /// Pointer buttons held while an event was generated.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Buttons: u8 {
        const LEFT = 0b001;
        const MIDDLE = 0b010;
        const RIGHT = 0b100;
    }
}

impl Buttons {
    /// Whether exactly one button is held.
    pub fn is_single(self) -> bool {
        self.bits().count_ones() == 1
    }
}

impl From<MouseButton> for Buttons {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Buttons::LEFT,
            MouseButton::Middle => Buttons::MIDDLE,
            MouseButton::Right => Buttons::RIGHT,
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Kind of raw pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerEventKind {
    /// A button went down.
    Press(MouseButton),
    /// A button went up.
    Release(MouseButton),
    /// Pointer moved with at least one button held.
    Drag,
    /// Pointer moved with no button held.
    Move,
    /// Pointer entered the component.
    Enter,
    /// Pointer left the component.
    Exit,
}

/// A raw pointer event delivered to a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    /// Position in component coordinates.
    pub position: Point,
    /// Position in screen coordinates.
    pub screen_position: Point,
    /// Buttons held after this event was applied.
    pub buttons: Buttons,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Create an event whose component and screen coordinates coincide.
    pub fn new(kind: PointerEventKind, position: Point, buttons: Buttons, modifiers: Modifiers) -> Self {
        Self {
            kind,
            position,
            screen_position: position,
            buttons,
            modifiers,
        }
    }

    /// Set the screen position of the event.
    pub fn with_screen_position(mut self, screen_position: Point) -> Self {
        self.screen_position = screen_position;
        self
    }

    /// Vector from `origin` to this event, in component coordinates.
    pub fn delta_from(&self, origin: Point) -> Vec2 {
        self.position - origin
    }
}

/// Receives raw pointer events from a component.
pub trait PointerListener: Send + Sync {
    fn on_pointer(&self, event: &PointerEvent);
}

/// A component owned by the window system that can host recognizers and drop gates.
pub trait Component: Send + Sync {
    /// Identifier of the component.
    fn id(&self) -> ComponentId;

    /// Start delivering pointer events to `listener`.
    fn add_pointer_listener(&self, listener: Arc<dyn PointerListener>);

    /// Stop delivering pointer events to `listener`.
    fn remove_pointer_listener(&self, listener: &Arc<dyn PointerListener>);
}

/// Compare two shared objects by address, ignoring vtables.
pub(crate) fn same_object<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
