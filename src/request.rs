//! Inbound and synthetic request contexts
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

use crate::app::{App, Identity};
use crate::error::{Error, ErrorKind};
use crate::method::Method;
use crate::result::Result;
use crate::routing::PathArgs;

/// A request as received from the outer request parsing layer
#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl RawRequest {
    /// Create a new request for an absolute URL
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::new(ErrorKind::Parse, format!("invalid URL '{url}': {e}")))?;
        Ok(Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: Vec::new(),
        })
    }

    /// Return a new request including the given header. Header names are case insensitive
    pub fn with_header(self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let Self { mut headers, .. } = self;
        headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        Self { headers, ..self }
    }

    pub fn with_body(self, body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..self
        }
    }

    /// Return a new request with the JSON serialization of the value as body
    pub fn with_json(self, value: &Value) -> Self {
        self.with_body(value.to_string())
            .with_header("content-type", "application/json")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }
}

/// A method/path override currently in effect on a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub method: Method,
    pub path: String,
}

/// Connection state shared by a request and every synthetic request derived from it
pub struct Session {
    app: App,
    identity: Identity,
    overrides: Mutex<Vec<Override>>,
}

impl Session {
    pub(crate) fn new(app: App, identity: Identity) -> Self {
        Self {
            app,
            identity,
            overrides: Mutex::new(Vec::new()),
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    // A poisoned lock only means a handler panicked while holding a lease,
    // the override list itself is always consistent
    fn overrides(&self) -> MutexGuard<'_, Vec<Override>> {
        self.overrides
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Acquire a method override on the session
    ///
    /// The override stays active until the returned lease is dropped, which restores the session
    /// to the state it had before the call.
    pub fn override_method(&self, method: Method, path: impl Into<String>) -> MethodOverride<'_> {
        let mut overrides = self.overrides();
        let depth = overrides.len();
        overrides.push(Override {
            method,
            path: path.into(),
        });
        MethodOverride {
            session: self,
            depth,
        }
    }

    /// Return the innermost override currently in effect
    pub fn active_override(&self) -> Option<Override> {
        self.overrides().last().cloned()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("overrides", &*self.overrides())
            .finish()
    }
}

/// Lease over a session method override, see [`Session::override_method`]
#[must_use = "the override is released as soon as the lease is dropped"]
pub struct MethodOverride<'a> {
    session: &'a Session,
    depth: usize,
}

impl Drop for MethodOverride<'_> {
    fn drop(&mut self) {
        self.session.overrides().truncate(self.depth);
    }
}

/// An initialized request
///
/// Requests are cheap to clone, the connection state lives in a shared [`Session`].
#[derive(Clone)]
pub struct Request {
    method: Method,
    url: Url,
    args: PathArgs,
    body: Value,
    synthetic: bool,
    session: Arc<Session>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        url: Url,
        args: PathArgs,
        body: Value,
        session: Arc<Session>,
    ) -> Self {
        Self {
            method,
            url,
            args,
            body,
            synthetic: false,
            session,
        }
    }

    /// Derive a request for a different target, sharing this request session
    ///
    /// The new request is not re-initialized, the identity of the caller is kept as is. This
    /// request is not modified.
    pub fn synthesize(&self, method: Method, url: Url, args: PathArgs, body: Value) -> Request {
        Request {
            method,
            url,
            args,
            body,
            synthetic: true,
            session: Arc::clone(&self.session),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// The path arguments of the matched route
    pub fn args(&self) -> &PathArgs {
        &self.args
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Returns true if the request was derived through [`Request::synthesize`]
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn identity(&self) -> &Identity {
        self.session.identity()
    }

    pub fn app(&self) -> &App {
        self.session.app()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("args", &self.args)
            .field("synthetic", &self.synthetic)
            .finish()
    }
}

pub(crate) fn empty_body() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Router;
    use serde_json::json;

    fn request() -> Request {
        let app = App::new(Router::new());
        let session = Arc::new(Session::new(app, Identity::user("ada")));
        Request::new(
            Method::Patch,
            Url::parse("http://testserver/flobbits/").unwrap(),
            PathArgs::default(),
            json!([]),
            session,
        )
    }

    #[test]
    fn it_normalizes_header_names() {
        let raw = RawRequest::new(Method::Get, "http://testserver/")
            .unwrap()
            .with_header("Authorization", "Token abc");
        assert_eq!(raw.header("authorization"), Some("Token abc"));
        assert_eq!(raw.header("AUTHORIZATION"), Some("Token abc"));
    }

    #[test]
    fn it_rejects_relative_urls() {
        let err = RawRequest::new(Method::Get, "/flobbits/").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn synthetic_requests_share_the_session() {
        let request = request();
        let url = Url::parse("http://testserver/flobbits/1/").unwrap();
        let synthetic = request.synthesize(
            Method::Put,
            url,
            PathArgs::from(vec![("flobbit_id", "1")]),
            json!({"a": "b"}),
        );

        assert!(synthetic.is_synthetic());
        assert_eq!(synthetic.method(), Method::Put);
        assert_eq!(synthetic.path(), "/flobbits/1/");
        assert_eq!(synthetic.identity(), &Identity::user("ada"));

        // The outer request is left untouched
        assert!(!request.is_synthetic());
        assert_eq!(request.method(), Method::Patch);
        assert_eq!(request.body(), &json!([]));
    }

    #[test]
    fn overrides_are_released_when_the_lease_is_dropped() {
        let request = request();
        let session = request.session();
        {
            let _outer = session.override_method(Method::Post, "/flobbits/");
            {
                let _inner = session.override_method(Method::Delete, "/flobbits/1/");
                assert_eq!(
                    session.active_override(),
                    Some(Override {
                        method: Method::Delete,
                        path: "/flobbits/1/".to_string()
                    })
                );
            }
            assert_eq!(
                session.active_override().map(|o| o.method),
                Some(Method::Post)
            );
        }
        assert_eq!(session.active_override(), None);
    }

    #[test]
    fn overrides_are_released_on_panic() {
        let request = request();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lease = request.session().override_method(Method::Put, "/flobbits/1/");
            panic!("handler failed");
        }));
        assert!(result.is_err());
        assert_eq!(request.session().active_override(), None);
    }
}
