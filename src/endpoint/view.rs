use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{BoxedHandler, Endpoint, Handler, Permission};
use crate::bulk::BulkEdit;
use crate::error::{Error, ErrorKind};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::result::Result;

/// The standard endpoint, serving each method with its own handler
///
/// ```rust
/// use bulkedit::bulk::BulkEdit;
/// use bulkedit::endpoint::{IsAuthenticated, View};
/// use bulkedit::extract::Json;
/// use bulkedit::response::status;
/// use serde_json::Value;
///
/// fn create(Json(value): Json<Value>) -> (u16, Json<Value>) {
///     (status::CREATED, Json(value))
/// }
///
/// let view = View::new()
///     .post(create)
///     .permission(IsAuthenticated)
///     .bulk_edit(BulkEdit::new());
/// ```
#[derive(Clone, Default)]
pub struct View {
    handlers: BTreeMap<Method, BoxedHandler>,
    permissions: Vec<Arc<dyn Permission>>,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the method with the given handler, replacing any previous handler for it
    pub fn on<H, T>(mut self, method: Method, handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.handlers
            .insert(method, BoxedHandler::from_handler(handler));
        self
    }

    pub fn get<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::Get, handler)
    }

    pub fn post<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::Post, handler)
    }

    pub fn put<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::Put, handler)
    }

    pub fn patch<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::Patch, handler)
    }

    pub fn delete<H: Handler<T>, T: 'static>(self, handler: H) -> Self {
        self.on(Method::Delete, handler)
    }

    /// Add a permission check, checks run in the order they are added
    pub fn permission<P: Permission>(mut self, permission: P) -> Self {
        self.permissions.push(Arc::new(permission));
        self
    }

    /// Accept bulk edits on this view
    ///
    /// This serves PATCH requests with the given [`BulkEdit`], the request body is the list of
    /// actions to apply.
    pub fn bulk_edit(self, bulk: BulkEdit) -> Self {
        self.patch(move |request: Request| bulk.handle(&request))
    }

    fn handler(&self, method: Method) -> Option<&BoxedHandler> {
        self.handlers.get(&method).or_else(|| match method {
            Method::Head => self.handlers.get(&Method::Get),
            _ => None,
        })
    }

    fn check_permissions(&self, request: &Request) -> Result<()> {
        if let Some(denied) = self
            .permissions
            .iter()
            .find(|p| !p.has_permission(request))
        {
            return Err(Error::new(
                ErrorKind::PermissionDenied,
                denied.message().to_string(),
            ));
        }
        Ok(())
    }

    fn serve(&self, request: &Request) -> Result<Response> {
        self.check_permissions(request)?;

        let method = request.method();
        let handler = match self.handler(method) {
            Some(handler) => handler,
            None if method == Method::Options => {
                let allowed: Vec<&str> =
                    self.allowed_methods().iter().map(Method::as_str).collect();
                return Ok(Response::ok(json!({ "allowed": allowed })));
            }
            None => {
                return Err(Error::new(
                    ErrorKind::MethodNotAllowed,
                    format!("Method \"{method}\" not allowed."),
                ))
            }
        };

        handler.call(request)
    }
}

impl Endpoint for View {
    fn allowed_methods(&self) -> BTreeSet<Method> {
        let mut methods: BTreeSet<Method> = self.handlers.keys().copied().collect();
        if methods.contains(&Method::Get) {
            methods.insert(Method::Head);
        }
        methods.insert(Method::Options);
        methods
    }

    #[instrument(
        name = "dispatch",
        skip_all,
        fields(method = %request.method(), path = request.path(), synthetic = request.is_synthetic())
    )]
    fn dispatch(&self, request: &Request) -> Result<Response> {
        let response = self.serve(request).or_else(Error::try_into_response)?;
        debug!(status = response.status, "request dispatched");
        Ok(response)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("methods", &self.allowed_methods())
            .field("permissions", &self.permissions.len())
            .finish()
    }
}
