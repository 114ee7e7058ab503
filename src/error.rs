use serde_json::{json, Map, Value};
use std::fmt;

use crate::response::{status, Response};

#[doc(hidden)]
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A list specifying categories of bulkedit errors
///
/// used with the [`Error`] type
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An action is malformed, e.g. a required field is missing
    Schema,
    /// The action target does not resolve, is not a supported endpoint or
    /// cannot be edited from the current endpoint
    InvalidTarget,
    /// The target endpoint does not support the method implied by the action
    UnsupportedAction,
    /// The request body or one of the handler arguments could not be parsed
    Parse,
    /// No route matches the requested path
    NotFound,
    /// The endpoint does not handle the request method
    MethodNotAllowed,
    /// A permission check rejected the request
    PermissionDenied,
    /// A handler answered with an explicit error status
    Rejected,
    /// One or more actions in a batch finished with an unacceptable status
    Aggregate,
    /// An error happened trying to serialize or deserialize into provided type
    Serialization,
    /// The transaction layer failed to begin, commit or roll back
    Transaction,
    /// An internal error happened, this is probably a bug in bulkedit or one of its dependencies
    Internal,
}

impl ErrorKind {
    pub(crate) fn as_str(&self) -> &'static str {
        use ErrorKind::*;
        match *self {
            Schema => "invalid action",
            InvalidTarget => "invalid action target",
            UnsupportedAction => "unsupported action",
            Parse => "malformed request",
            NotFound => "not found",
            MethodNotAllowed => "method not allowed",
            PermissionDenied => "permission denied",
            Rejected => "request rejected",
            Aggregate => "bulk edit failed",
            Serialization => "serialization failed",
            Transaction => "transaction error",
            Internal => "internal error",
        }
    }

    /// The client visible status for errors of this kind
    ///
    /// `Rejected` and `Aggregate` errors carry their own status. Kinds that return `None` are not
    /// meant to be shown to the client and propagate out of dispatch.
    pub fn status(&self) -> Option<u16> {
        use ErrorKind::*;
        match *self {
            Schema | InvalidTarget | UnsupportedAction | Parse => Some(status::BAD_REQUEST),
            NotFound => Some(status::NOT_FOUND),
            MethodNotAllowed => Some(status::METHOD_NOT_ALLOWED),
            PermissionDenied => Some(status::FORBIDDEN),
            Rejected | Aggregate | Serialization | Transaction | Internal => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    /// Shows a human-readable description of the `ErrorKind`.
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            field: None,
            status: None,
            detail: None,
            error: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::new(ErrorKind::Serialization, e)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    field: Option<String>,
    status: Option<u16>,
    detail: Option<Value>,
    error: Option<BoxError>,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    /// Shows a human-readable description of the `Error`.
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.field.as_ref(), self.error.as_ref()) {
            (Some(field), Some(source)) => write!(fmt, "{field}: {source}"),
            (None, Some(source)) => write!(fmt, "{source}"),
            (Some(field), None) => write!(fmt, "{field}: {}", self.kind.as_str()),
            (None, None) => write!(fmt, "{}", self.kind.as_str()),
        }
    }
}

impl Error {
    pub fn new<E: Into<BoxError>>(kind: ErrorKind, error: E) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::from(kind)
        }
    }

    /// Create a field level validation error
    pub fn field<E: Into<BoxError>>(kind: ErrorKind, field: impl Into<String>, error: E) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(kind, error)
        }
    }

    /// Create an error answering the request with the given status and body
    ///
    /// This is what handlers should return to signal a client visible failure, e.g. a missing
    /// object.
    pub fn reject(status: u16, detail: Value) -> Self {
        Self {
            status: Some(status),
            detail: Some(detail),
            ..Self::from(ErrorKind::Rejected)
        }
    }

    /// Create a batch failure carrying the aggregate status and the body of every action
    pub fn aggregate(status: u16, bodies: Vec<Value>) -> Self {
        Self {
            status: Some(status),
            detail: Some(Value::Array(bodies)),
            ..Self::from(ErrorKind::Aggregate)
        }
    }

    pub fn not_found(path: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("no route matches '{path}'"))
    }

    pub fn internal<E: Into<BoxError>>(error: E) -> Self {
        Self::new(ErrorKind::Internal, error)
    }

    /// Return a copy of the error with the given detail body
    pub fn with_detail(self, detail: Value) -> Self {
        Self {
            detail: Some(detail),
            ..self
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The offending field, for field level validation errors
    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn source(&self) -> Option<&BoxError> {
        self.error.as_ref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status.or_else(|| self.kind.status())
    }

    /// Returns true if the error should be answered to the client rather than propagated
    pub fn is_client_visible(&self) -> bool {
        self.status().is_some()
    }

    fn message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| self.kind.as_str().to_string())
    }

    /// The body describing the error to the client
    pub fn detail(&self) -> Value {
        if let Some(detail) = self.detail.as_ref() {
            return detail.clone();
        }

        match self.field.as_ref() {
            Some(field) => {
                let mut map = Map::new();
                map.insert(field.clone(), json!([self.message()]));
                Value::Object(map)
            }
            None => json!({ "detail": self.message() }),
        }
    }

    /// Convert a client visible error into a response
    ///
    /// Returns the error back if it has no client status.
    pub fn try_into_response(self) -> Result<Response, Error> {
        match self.status() {
            Some(status) => Ok(Response::new(status).with_body(self.detail())),
            None => Err(self),
        }
    }
}
