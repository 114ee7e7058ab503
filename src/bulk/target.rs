use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::{Error, ErrorKind};
use crate::request::Request;
use crate::result::Result;
use crate::routing::{PathArgs, Route};

/// The endpoint an action URL resolves to
#[derive(Clone)]
pub struct ResolvedTarget {
    /// Path of the target URL
    pub path: String,
    pub endpoint: Arc<dyn Endpoint>,
    /// Arguments of the matched route
    pub args: PathArgs,
    /// The full target URL
    pub url: Url,
}

impl PartialEq for ResolvedTarget {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && Arc::ptr_eq(&self.endpoint, &other.endpoint)
            && self.args == other.args
            && self.url == other.url
    }
}

impl fmt::Debug for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedTarget")
            .field("path", &self.path)
            .field("methods", &self.endpoint.allowed_methods())
            .field("args", &self.args)
            .field("url", &self.url.as_str())
            .finish()
    }
}

pub(crate) fn invalid_target(url: &str) -> Error {
    Error::field(
        ErrorKind::InvalidTarget,
        "url",
        format!("URL target is invalid or can't be edited by this endpoint: {url}"),
    )
}

/// Resolve an action URL to the endpoint serving it
///
/// Relative URLs are resolved against the URL of the current request. The target must be
/// served from the same origin as the current request and be routed to an [`Endpoint`], plain
/// function routes cannot be the target of an action.
pub fn resolve(url: &str, request: &Request) -> Result<ResolvedTarget> {
    let target = request
        .url()
        .join(url)
        .map_err(|_| Error::field(ErrorKind::Schema, "url", "Enter a valid URL."))?;

    if target.origin() != request.url().origin() {
        debug!(url, "target origin does not match the request");
        return Err(invalid_target(url));
    }

    let (route, args) = request.app().router().resolve(target.path()).map_err(|e| {
        debug!(url, "{e}");
        invalid_target(url)
    })?;

    let endpoint = match route {
        Route::Endpoint(endpoint) => endpoint,
        Route::Function(_) => {
            debug!(url, "target is not served by an endpoint");
            return Err(invalid_target(url));
        }
    };

    Ok(ResolvedTarget {
        path: target.path().to_string(),
        endpoint,
        args,
        url: target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, Identity};
    use crate::endpoint::View;
    use crate::method::Method;
    use crate::request::Session;
    use crate::response::Response;
    use crate::routing::Router;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request() -> Request {
        let router = Router::new()
            .endpoint("/flobbits/", View::new().post(|| ()))
            .endpoint("/flobbits/{flobbit_id}/", View::new().put(|| ()))
            .function("/flobbits/non-apiview/", |_: &Request| {
                Ok(Response::no_content())
            });
        let session = Arc::new(Session::new(App::new(router), Identity::anonymous()));
        Request::new(
            Method::Patch,
            Url::parse("http://testserver/flobbits/").unwrap(),
            PathArgs::default(),
            json!([]),
            session,
        )
    }

    #[test]
    fn it_resolves_absolute_urls() {
        let target = resolve("http://testserver/flobbits/1/", &request()).unwrap();
        assert_eq!(target.path, "/flobbits/1/");
        assert_eq!(target.args, PathArgs::from(vec![("flobbit_id", "1")]));
        assert!(target.endpoint.allowed_methods().contains(&Method::Put));
    }

    #[test]
    fn it_resolves_relative_urls() {
        let request = request();
        let target = resolve("/flobbits/2/", &request).unwrap();
        assert_eq!(target.url.as_str(), "http://testserver/flobbits/2/");

        let target = resolve("3/", &request).unwrap();
        assert_eq!(target.path, "/flobbits/3/");
    }

    #[test]
    fn it_rejects_other_origins() {
        for url in [
            "http://elsewhere/flobbits/1/",
            "https://testserver/flobbits/1/",
            "http://testserver:8080/flobbits/1/",
        ] {
            let err = resolve(url, &request()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTarget);
            assert_eq!(err.field_name(), Some("url"));
        }
    }

    #[test]
    fn it_rejects_unrouted_paths() {
        let err = resolve("/nowhere/", &request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
        assert_eq!(
            err.detail(),
            json!({ "url": ["URL target is invalid or can't be edited by this endpoint: /nowhere/"] })
        );
    }

    #[test]
    fn it_rejects_function_routes() {
        let err = resolve("/flobbits/non-apiview/", &request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    }

    #[test]
    fn it_rejects_malformed_urls() {
        let err = resolve("http://[::1", &request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.detail(), json!({ "url": ["Enter a valid URL."] }));
    }
}
