//! Error types shared by every drag-and-drop component.

use thiserror::Error;

/// Drag-and-drop errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DndError {
    #[error("a drag operation is already in progress")]
    Busy,
    #[error("invalid drag trigger: {0}")]
    InvalidTrigger(&'static str),
    #[error("a listener is already registered")]
    ListenerAlreadyPresent,
    #[error("listener does not match the registered listener")]
    ListenerMismatch,
    #[error("a drop gate cannot listen to itself")]
    SelfRegistration,
    #[error("null {0} event")]
    NullEvent(&'static str),
    #[error("invalid action: {0:#x}")]
    InvalidAction(u32),
    #[error("gesture accumulation was never initialized")]
    NotInitialized,
    #[error("unsupported flavor: {0}")]
    UnsupportedFlavor(String),
    #[error("no platform context is bound")]
    NotBound,
    #[error("listener failed: {0}")]
    Listener(String),
    #[error("platform bridge error: {0}")]
    Bridge(String),
}

/// Broad cause of a [`DndError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller broke an API precondition (listener discipline, null input).
    Precondition,
    /// The call is not allowed in the current protocol state.
    ProtocolState,
    /// An action mask was outside the known bits.
    InvalidMask,
    /// Payload data could not be produced.
    Data,
    /// The platform bridge or a client listener failed.
    Platform,
}

impl DndError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTrigger(_)
            | Self::ListenerAlreadyPresent
            | Self::ListenerMismatch
            | Self::SelfRegistration
            | Self::NullEvent(_) => ErrorKind::Precondition,
            Self::Busy | Self::NotInitialized | Self::NotBound => ErrorKind::ProtocolState,
            Self::InvalidAction(_) => ErrorKind::InvalidMask,
            Self::UnsupportedFlavor(_) => ErrorKind::Data,
            Self::Listener(_) | Self::Bridge(_) => ErrorKind::Platform,
        }
    }
}

/// Result type for drag-and-drop operations.
pub type DndResult<T> = Result<T, DndError>;
