//! The application serving requests
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind};
use crate::request::{empty_body, RawRequest, Request, Session};
use crate::response::Response;
use crate::result::Result;
use crate::routing::{PathArgs, Router};
use crate::store::Atomic;

mod auth;
mod resources;

pub use auth::*;
pub use resources::*;

/// Routes, shared resources and collaborators of a web API
///
/// `App` is cheap to clone and can be shared between worker threads.
///
/// ```rust
/// use bulkedit::app::App;
/// use bulkedit::endpoint::View;
/// use bulkedit::routing::Router;
/// use bulkedit::store::Store;
///
/// let store = Store::default();
/// let app = App::new(Router::new().endpoint("/flobbits/", View::new().post(|| ())))
///     .resource(store.clone())
///     .transactions(store);
/// ```
#[derive(Clone)]
pub struct App {
    router: Arc<Router>,
    resources: Arc<Resources>,
    transactions: Option<Arc<dyn Atomic>>,
    authenticator: Option<Arc<dyn Authenticate>>,
}

impl App {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            resources: Arc::new(Resources::new()),
            transactions: None,
            authenticator: None,
        }
    }

    /// Add a shared resource, available to handlers through the
    /// [Res](`crate::extract::Res`) extractor
    ///
    /// Only one resource of each type can be provided.
    pub fn resource<R: Send + Sync + 'static>(mut self, res: R) -> Self {
        Arc::make_mut(&mut self.resources).insert(res);
        self
    }

    /// Set the transaction layer used to make bulk edits atomic
    pub fn transactions<A: Atomic>(self, atomic: A) -> Self {
        Self {
            transactions: Some(Arc::new(atomic)),
            ..self
        }
    }

    /// Set the authenticator used when initializing requests
    pub fn authenticator<A: Authenticate>(self, auth: A) -> Self {
        Self {
            authenticator: Some(Arc::new(auth)),
            ..self
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn atomic(&self) -> Option<&dyn Atomic> {
        self.transactions.as_deref()
    }

    /// Build a request context from a raw request
    ///
    /// This establishes the identity of the caller and parses the request body.
    #[instrument(skip_all, err)]
    pub fn initialize_request(&self, raw: RawRequest, args: PathArgs) -> Result<Request> {
        let identity = match self.authenticator.as_ref() {
            Some(auth) => auth.authenticate(&raw)?,
            None => Identity::anonymous(),
        };

        let body = if raw.body.iter().all(u8::is_ascii_whitespace) {
            empty_body()
        } else {
            serde_json::from_slice(&raw.body)
                .map_err(|e| Error::new(ErrorKind::Parse, format!("JSON parse error - {e}")))?
        };

        let session = Arc::new(Session::new(self.clone(), identity));
        Ok(Request::new(raw.method, raw.url, args, body, session))
    }

    /// Serve a request
    ///
    /// Client visible errors are converted into a response, any other error is returned to
    /// the caller.
    #[instrument(name = "handle", skip_all, fields(method = %raw.method, path = raw.url.path()))]
    pub fn handle(&self, raw: RawRequest) -> Result<Response> {
        let response = self
            .router
            .resolve(raw.url.path())
            .and_then(|(route, args)| {
                let request = self.initialize_request(raw, args)?;
                route.call(&request)
            })
            .or_else(Error::try_into_response)?;

        debug!(
            status = response.status,
            success = response.is_success(),
            "request served"
        );
        Ok(response)
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("router", &self.router)
            .field("resources", &self.resources.len())
            .field("transactions", &self.transactions.is_some())
            .field("authenticator", &self.authenticator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::View;
    use crate::extract::{Auth, Json};
    use crate::method::Method;
    use serde_json::{json, Value};

    fn app() -> App {
        let router = Router::new()
            .endpoint(
                "/echo/",
                View::new().post(|Json(body): Json<Value>| Json(body)),
            )
            .endpoint(
                "/whoami/",
                View::new().get(|Auth(identity): Auth| {
                    Json(json!({ "user": identity.username() }))
                }),
            )
            .function("/broken/", |_: &Request| Err(Error::internal("boom")));

        App::new(router).authenticator(TokenAuthentication::new().token("abc", "ada"))
    }

    fn raw(method: Method, path: &str) -> RawRequest {
        RawRequest::new(method, &format!("http://testserver{path}")).unwrap()
    }

    #[test]
    fn it_answers_404_for_unknown_paths() {
        let res = app().handle(raw(Method::Get, "/nowhere/")).unwrap();
        assert_eq!(res.status, 404);
    }

    #[test]
    fn it_parses_json_bodies() {
        let res = app()
            .handle(raw(Method::Post, "/echo/").with_json(&json!({"a": "b"})))
            .unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body, Some(json!({"a": "b"})));
    }

    #[test]
    fn it_answers_400_for_malformed_bodies() {
        let res = app()
            .handle(raw(Method::Post, "/echo/").with_body("{not json"))
            .unwrap();
        assert_eq!(res.status, 400);
    }

    #[test]
    fn it_authenticates_requests() {
        let res = app()
            .handle(raw(Method::Get, "/whoami/").with_header("Authorization", "Token abc"))
            .unwrap();
        assert_eq!(res.body, Some(json!({"user": "ada"})));

        let res = app()
            .handle(raw(Method::Get, "/whoami/").with_header("Authorization", "Token nope"))
            .unwrap();
        assert_eq!(res.status, 403);
    }

    #[test]
    fn it_propagates_internal_errors() {
        let err = app().handle(raw(Method::Get, "/broken/")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
