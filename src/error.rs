//! Unified error type.

use serde_json::{Value, json};
use thiserror::Error;

/// A boxed error returned by an operation handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a dispatch can fail.
///
/// The first three variants are raised by the router itself. The rest come
/// from the handler side: a payload that does not fit the handler's input
/// type, an output that cannot be represented, or the handler's own error.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No operation is registered under this name. No middleware ran.
    #[error("Operation not found")]
    OperationNotFound { name: String },

    /// The handler declares an input but the call supplied none.
    /// Neither middleware nor the handler ran.
    ///
    /// `name` is empty when a boxed handler is called directly, outside a
    /// router, since the handler does not know the name it is registered
    /// under.
    #[error("payload must be provided")]
    PayloadRequired { name: String },

    /// A middleware stage set `payload.error`; the handler did not run.
    #[error("{}", display_value(.error))]
    MiddlewareRejected { stage: &'static str, error: Value },

    /// The payload could not be decoded into the handler's input type.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// The handler output could not be encoded, or a typed call could not
    /// decode it into the operation's output type.
    #[error("invalid output: {0}")]
    InvalidOutput(#[source] serde_json::Error),

    /// The handler's own error, passed through untouched.
    #[error(transparent)]
    Handler(BoxError),
}

/// Discriminant of [`DispatchError`], handy for matching and metrics labels.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    OperationNotFound,
    PayloadRequired,
    MiddlewareRejected,
    InvalidPayload,
    InvalidOutput,
    Handler,
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OperationNotFound { .. } => ErrorKind::OperationNotFound,
            Self::PayloadRequired { .. } => ErrorKind::PayloadRequired,
            Self::MiddlewareRejected { .. } => ErrorKind::MiddlewareRejected,
            Self::InvalidPayload(_) => ErrorKind::InvalidPayload,
            Self::InvalidOutput(_) => ErrorKind::InvalidOutput,
            Self::Handler(_) => ErrorKind::Handler,
        }
    }

    /// `true` for failures produced by the router's own resolution steps.
    pub fn is_router_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::OperationNotFound | ErrorKind::PayloadRequired | ErrorKind::MiddlewareRejected
        )
    }

    /// Renders the error as a single-field `{"error": ...}` record.
    ///
    /// A middleware rejection keeps the stage's error value verbatim, so a
    /// structured error stays structured. Everything else uses the display
    /// message.
    ///
    /// ```
    /// use oprouter::DispatchError;
    ///
    /// let err = DispatchError::OperationNotFound { name: "nope".into() };
    /// assert_eq!(err.sentinel(), serde_json::json!({ "error": "Operation not found" }));
    /// ```
    pub fn sentinel(&self) -> Value {
        match self {
            Self::MiddlewareRejected { error, .. } => json!({ "error": error }),
            other => json!({ "error": other.to_string() }),
        }
    }

    /// Attempts to downcast a handler error to its concrete type.
    pub fn handler_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<BoxError> for DispatchError {
    fn from(err: BoxError) -> Self {
        Self::Handler(err)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
