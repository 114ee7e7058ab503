use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::ResolvedTarget;
use crate::method::Method;
use crate::request::{empty_body, Request};
use crate::response::ActionOutcome;
use crate::result::Result;

/// Call the target endpoint as if the client had sent the request directly
///
/// The endpoint is dispatched a synthetic request with the given method, the target URL and
/// the payload as body (an empty object if there is none). The synthetic request shares the
/// session of the current request, so the caller identity is not established again.
///
/// A method override is held on the session while the endpoint runs and is released on every
/// exit path. Errors returned by the endpoint are propagated as is.
#[instrument(skip_all, fields(method = %method, path = %target.path))]
pub fn invoke(
    target: &ResolvedTarget,
    method: Method,
    payload: Option<&Map<String, Value>>,
    request: &Request,
) -> Result<ActionOutcome> {
    let _lease = request
        .session()
        .override_method(method, target.path.clone());

    let body = payload.cloned().map(Value::Object).unwrap_or_else(empty_body);
    let synthetic = request.synthesize(method, target.url.clone(), target.args.clone(), body);

    let response = target.endpoint.dispatch(&synthetic)?;
    debug!(status = response.status, "action applied");

    Ok(ActionOutcome::from(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, Identity};
    use crate::bulk::resolve;
    use crate::error::{Error, ErrorKind};
    use crate::extract::{Args, Auth, Json};
    use crate::request::{Override, Session};
    use crate::response::status;
    use crate::endpoint::View;
    use crate::routing::{PathArgs, Router};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;

    fn request(router: Router) -> Request {
        let session = Arc::new(Session::new(App::new(router), Identity::user("ada")));
        Request::new(
            Method::Patch,
            Url::parse("http://testserver/flobbits/").unwrap(),
            PathArgs::default(),
            json!([{"action": "delete", "url": "/flobbits/1/"}]),
            session,
        )
    }

    #[test]
    fn it_dispatches_a_synthetic_request() {
        let router = Router::new().endpoint(
            "/flobbits/{flobbit_id}/",
            View::new().put(
                |Args(id): Args<u32>, Json(value): Json<Value>, Auth(identity): Auth, req: Request| {
                    Json(json!({
                        "id": id,
                        "value": value,
                        "user": identity.username(),
                        "method": req.method().as_str(),
                        "synthetic": req.is_synthetic(),
                    }))
                },
            ),
        );
        let request = request(router);
        let target = resolve("/flobbits/7/", &request).unwrap();
        let payload = json!({"flerbies": 3});

        let outcome = invoke(&target, Method::Put, payload.as_object(), &request).unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(
            outcome.body,
            json!({
                "id": 7,
                "value": {"flerbies": 3},
                "user": "ada",
                "method": "PUT",
                "synthetic": true,
            })
        );

        // the current request is left untouched
        assert_eq!(request.method(), Method::Patch);
        assert!(!request.is_synthetic());
    }

    #[test]
    fn it_sends_an_empty_object_without_payload() {
        let router = Router::new().endpoint(
            "/flobbits/{flobbit_id}/",
            View::new().delete(|Json(value): Json<Value>| (status::OK, Json(value))),
        );
        let request = request(router);
        let target = resolve("/flobbits/1/", &request).unwrap();

        let outcome = invoke(&target, Method::Delete, None, &request).unwrap();
        assert_eq!(outcome.body, json!({}));
    }

    #[test]
    fn it_holds_the_method_override_while_dispatching() {
        let router = Router::new().endpoint(
            "/flobbits/{flobbit_id}/",
            View::new().delete(|req: Request| {
                let active = req.session().active_override();
                assert_eq!(
                    active,
                    Some(Override {
                        method: Method::Delete,
                        path: "/flobbits/1/".to_string()
                    })
                );
            }),
        );
        let request = request(router);
        let target = resolve("/flobbits/1/", &request).unwrap();

        let outcome = invoke(&target, Method::Delete, None, &request).unwrap();
        assert_eq!(outcome.status, 204);
        assert_eq!(request.session().active_override(), None);
    }

    #[test]
    fn it_releases_the_override_on_failure() {
        let router = Router::new().endpoint(
            "/flobbits/{flobbit_id}/",
            View::new().delete(|| -> Result<()> { Err(Error::internal("boom")) }),
        );
        let request = request(router);
        let target = resolve("/flobbits/1/", &request).unwrap();

        let err = invoke(&target, Method::Delete, None, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(request.session().active_override(), None);
    }
}
