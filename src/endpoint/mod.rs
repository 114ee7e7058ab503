//! Endpoints and the handlers serving them
//!
//! An [`Endpoint`] is the capability interface every addressable handler exposes: the set of
//! methods it supports and a `dispatch` operation running its whole request pipeline. Only routes
//! served by an endpoint can be the target of a bulk edit action.
//!
//! [`View`] is the standard endpoint implementation, assembled from one [`Handler`] per method.
use std::collections::BTreeSet;

use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::result::Result;

mod boxed;
mod handler;
mod permission;
mod view;

pub(crate) use boxed::*;
pub use handler::*;
pub use permission::*;
pub use view::*;

/// A class based request handler
pub trait Endpoint: Send + Sync + 'static {
    /// The methods the endpoint responds to
    fn allowed_methods(&self) -> BTreeSet<Method>;

    /// Run the full request pipeline for the request
    ///
    /// Client visible errors should be answered with a response, only errors without a client
    /// status are expected to be returned as `Err`.
    fn dispatch(&self, request: &Request) -> Result<Response>;
}
