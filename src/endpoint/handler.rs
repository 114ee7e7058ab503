use crate::extract::FromRequest;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::result::Result;

/// Trait for functions that can be used to serve a request method on a [View](`super::View`)
///
/// A handler is any function taking up to 16 [extractors](`crate::extract`) as arguments and
/// returning a value that can be converted [into a response](`crate::response::IntoResponse`).
///
/// ```rust
/// use bulkedit::extract::{Args, Json};
/// use bulkedit::endpoint::View;
/// use bulkedit::error::Error;
/// use bulkedit::response::status;
/// use serde_json::{json, Value};
///
/// fn update(Args(id): Args<u32>, Json(value): Json<Value>) -> Result<Json<Value>, Error> {
///     if id == 0 {
///         return Err(Error::reject(status::NOT_FOUND, json!({"detail": "Not found."})));
///     }
///     Ok(Json(value))
/// }
///
/// let view = View::new().put(update);
/// ```
pub trait Handler<T>: Clone + Send + Sync + 'static {
    fn call(&self, request: &Request) -> Result<Response>;
}

macro_rules! impl_handler {
    (
        $first:ident, $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused)]
        impl<F, $($ty,)* Res> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Res + Clone + Send + Sync + 'static,
            Res: IntoResponse,
            $($ty: FromRequest,)*
        {
            fn call(&self, request: &Request) -> Result<Response> {
                $(
                    let $ty = $ty::from_request(request)?;
                )*

                (self)($($ty,)*).into_response()
            }
        }
    };
}

impl_handler!(T1,);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15, T16);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15, T16, T17);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, Identity};
    use crate::error::ErrorKind;
    use crate::extract::{Args, Json, Path};
    use crate::method::Method;
    use crate::request::Session;
    use crate::routing::{PathArgs, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use url::Url;

    fn request(body: Value) -> Request {
        let session = Arc::new(Session::new(App::new(Router::new()), Identity::anonymous()));
        Request::new(
            Method::Put,
            Url::parse("http://testserver/flobbits/1/").unwrap(),
            PathArgs::from(vec![("flobbit_id", "1")]),
            body,
            session,
        )
    }

    fn call<T, H: Handler<T>>(handler: H, request: &Request) -> Result<Response> {
        handler.call(request)
    }

    #[test]
    fn it_calls_handlers_without_arguments() {
        let res = call(|| (), &request(json!({}))).unwrap();
        assert_eq!(res.status, 204);
    }

    #[test]
    fn it_extracts_handler_arguments() {
        fn update(Args(id): Args<u32>, Path(path): Path, Json(body): Json<Value>) -> Json<Value> {
            Json(json!({ "id": id, "path": path, "body": body }))
        }

        let res = call(update, &request(json!({"flerbies": 2}))).unwrap();
        assert_eq!(
            res.body,
            Some(json!({ "id": 1, "path": "/flobbits/1/", "body": {"flerbies": 2} }))
        );
    }

    #[test]
    fn it_fails_if_an_argument_cannot_be_extracted() {
        #[derive(serde::Deserialize)]
        struct Flobbit {
            #[allow(dead_code)]
            flerbies: u32,
        }

        let err = call(|_: Json<Flobbit>| (), &request(json!({"a": "b"}))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
