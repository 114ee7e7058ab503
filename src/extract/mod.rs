//! Types and traits for extracting handler arguments from a request
//!
//! A [handler](`crate::endpoint::Handler`) is any function that accepts zero or more "extractors"
//! as arguments and returns something that can be converted into a
//! [response](`crate::response::IntoResponse`). An extractor is a type that implements
//! [`FromRequest`].
//!
//! ```rust
//! use bulkedit::extract::{Args, Auth, Json, Path, Res};
//! use bulkedit::store::Store;
//! use serde_json::Value;
//!
//! // `Json` deserializes the request body
//! fn json(Json(body): Json<Value>) {}
//!
//! // `Args` gives you the path arguments and deserializes them
//! fn args(Args(flobbit_id): Args<u32>) {}
//!
//! // `Path` gives you the request path
//! fn path(Path(path): Path) {}
//!
//! // `Auth` gives you the identity of the caller
//! fn auth(Auth(identity): Auth) {}
//!
//! // `Res` allows to access a shared resource
//! fn res(store: Res<Store>) {}
//! ```
//!
//! Extractors see the request the handler is dispatched with. When an endpoint is called as
//! part of a bulk edit, that is the synthetic request built for the action: `Json` gives the
//! action value and `Args` the arguments of the action target.
use thiserror::Error;

use crate::error::{Error, ErrorKind};
use crate::method::Method;
use crate::request::Request;
use crate::result::Result;

mod args;
mod auth;
mod json;
mod path;
mod res;

pub use args::*;
pub use auth::*;
pub use json::*;
pub use path::*;
pub use res::*;

#[derive(Debug, Error)]
#[error("argument extraction failed: {0:#}")]
/// Arguments to a handler could not be extracted from the request
pub struct ExtractionError(#[from] anyhow::Error);

impl From<ExtractionError> for Error {
    fn from(err: ExtractionError) -> Self {
        Error::new(ErrorKind::Parse, err)
    }
}

/// Trait for types that can be initialized from a request
pub trait FromRequest: Sized {
    fn from_request(request: &Request) -> Result<Self>;
}

impl FromRequest for Request {
    fn from_request(request: &Request) -> Result<Self> {
        Ok(request.clone())
    }
}

impl FromRequest for Method {
    fn from_request(request: &Request) -> Result<Self> {
        Ok(request.method())
    }
}
