//! Handler responses and the conversions into them

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::extract::Json;
use crate::result::Result;

/// Commonly used status codes
pub mod status {
    pub const OK: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const ACCEPTED: u16 = 202;
    pub const NO_CONTENT: u16 = 204;
    pub const BAD_REQUEST: u16 = 400;
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    pub const CONFLICT: u16 = 409;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

/// The result of dispatching a request to an endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(status::OK).with_body(body)
    }

    pub fn no_content() -> Self {
        Self::new(status::NO_CONTENT)
    }

    pub fn with_body(self, body: Value) -> Self {
        Self {
            body: Some(body),
            ..self
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for types that can be converted into a [`Response`]
///
/// Conversion is fallible: serialization may fail and an [`Error`] returned by a handler is
/// converted back into `Err` so it keeps propagating.
pub trait IntoResponse {
    fn into_response(self) -> Result<Response>;
}

impl IntoResponse for Response {
    fn into_response(self) -> Result<Response> {
        Ok(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Result<Response> {
        Ok(Response::no_content())
    }
}

impl IntoResponse for u16 {
    fn into_response(self) -> Result<Response> {
        Ok(Response::new(self))
    }
}

impl IntoResponse for Value {
    fn into_response(self) -> Result<Response> {
        Ok(Response::ok(self))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Result<Response> {
        let body = serde_json::to_value(self.0)?;
        Ok(Response::ok(body))
    }
}

impl<T: Serialize> IntoResponse for (u16, Json<T>) {
    fn into_response(self) -> Result<Response> {
        let (status, Json(value)) = self;
        let body = serde_json::to_value(value)?;
        Ok(Response::new(status).with_body(body))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Result<Response> {
        Err(self)
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for std::result::Result<T, E> {
    fn into_response(self) -> Result<Response> {
        match self {
            Ok(value) => value.into_response(),
            Err(err) => err.into_response(),
        }
    }
}

/// The status and body produced by one action of a bulk edit
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub status: u16,
    pub body: Value,
}

impl From<Response> for ActionOutcome {
    fn from(response: Response) -> Self {
        Self {
            status: response.status,
            body: response.body.unwrap_or(Value::Null),
        }
    }
}
