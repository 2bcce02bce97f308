//! Runtime error types.

use serde_json::Value;
use tether_compiler::{CompileError, ViewRef};
use thiserror::Error;

use crate::codec::ComponentId;

/// Raised by an adjustment hook to cancel an entire update.
///
/// State is left untouched and nothing is sent or notified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("update aborted: {reason}")]
pub struct AbortUpdate {
    pub reason: String,
}

impl AbortUpdate {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors from component operations.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("component {component} has no field '{field}'")]
    UnknownField {
        component: ComponentId,
        field: String,
    },

    #[error("field '{field}' does not hold a list")]
    NotAList { field: String },

    #[error("value {value} is not in list '{field}'")]
    NotInList { field: String, value: Value },

    #[error("component {0} has been destroyed")]
    Destroyed(ComponentId),

    #[error("no session is active on this thread")]
    NoActiveSession,

    /// Batching is not reentrant.
    #[error("component {0} already has an open batch")]
    BatchAlreadyOpen(ComponentId),

    #[error("list action '{0}' cannot be used inside a batch")]
    ActionInBatch(String),

    /// A batch flushes with the options it was opened with.
    #[error("component {0} has an open batch with different update options")]
    BatchOptionsMismatch(ComponentId),

    /// Two view types with different source share one reference.
    #[error("view reference '{0}' is already registered with different source")]
    DuplicateViewRef(ViewRef),

    /// A change set names both a field and a list action on that field.
    #[error("change set sets '{field}' and a list action on it at once")]
    KeyCollision { field: String },

    /// The component's view type failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Aborted(#[from] AbortUpdate),
}

/// Error type for request handlers and session-scoped application code.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from session-level operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("wire codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The mirror may only send `user_event` messages.
    #[error("unexpected '{0}' message from mirror")]
    UnexpectedMessage(&'static str),

    #[error("no component with id {0}")]
    UnknownComponent(ComponentId),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("wrapper '{0}' is already registered")]
    DuplicateWrapper(String),

    #[error("no wrapper named '{0}'")]
    UnknownWrapper(String),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Component result type alias.
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Session result type alias.
pub type SessionResult<T> = Result<T, SessionError>;
