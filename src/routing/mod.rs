//! Mapping of request paths to the handlers serving them
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::result::Result;

mod args;

pub use args::*;

type Function = Arc<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

/// The handler assigned to a route
#[derive(Clone)]
pub enum Route {
    /// A standard endpoint, declaring the methods it supports
    Endpoint(Arc<dyn Endpoint>),
    /// A bare function handling every request sent to the route
    Function(Function),
}

impl Route {
    /// Return the endpoint if the route is served by one
    pub fn as_endpoint(&self) -> Option<&Arc<dyn Endpoint>> {
        match self {
            Route::Endpoint(endpoint) => Some(endpoint),
            Route::Function(_) => None,
        }
    }

    pub(crate) fn call(&self, request: &Request) -> Result<Response> {
        match self {
            Route::Endpoint(endpoint) => endpoint.dispatch(request),
            Route::Function(func) => (func)(request),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Endpoint(endpoint) => f
                .debug_tuple("Endpoint")
                .field(&endpoint.allowed_methods())
                .finish(),
            Route::Function(_) => f.write_str("Function"),
        }
    }
}

#[derive(Default, Clone)]
pub struct Router {
    // The router stores the handler for every route pattern
    routes: matchit::Router<Route>,
    // Registered patterns, in insertion order
    patterns: Vec<String>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an endpoint to a route
    ///
    /// # Panics
    ///
    /// This function will panic if the route is not a valid pattern
    /// or if it conflicts with a previously registered route
    pub fn endpoint<E: Endpoint>(mut self, route: &str, endpoint: E) -> Self {
        self.insert_endpoint(route, endpoint);
        self
    }

    /// Assign a bare function to a route
    ///
    /// # Panics
    ///
    /// Same as [`Router::endpoint`]
    pub fn function<F>(mut self, route: &str, func: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.insert_function(route, func);
        self
    }

    pub fn insert_endpoint<E: Endpoint>(&mut self, route: &str, endpoint: E) {
        self.insert(route, Route::Endpoint(Arc::new(endpoint)));
    }

    pub fn insert_function<F>(&mut self, route: &str, func: F)
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.insert(route, Route::Function(Arc::new(func)));
    }

    fn insert(&mut self, route: &str, value: Route) {
        if let Err(e) = self.routes.insert(route, value) {
            panic!("cannot assign route '{route}': {e}");
        }
        self.patterns.push(String::from(route));
    }

    /// Iterate over the registered route patterns
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.as_str())
    }

    /// Find the route serving the given path
    ///
    /// Fails with a `NotFound` error if no route matches.
    pub fn resolve(&self, path: &str) -> Result<(Route, PathArgs)> {
        let matched = self.routes.at(path).map_err(|_| Error::not_found(path))?;
        let args = PathArgs::from(matched.params);
        trace!(path, %args, "route resolved");
        Ok((matched.value.clone(), args))
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("patterns", &self.patterns)
            .finish()
    }
}
