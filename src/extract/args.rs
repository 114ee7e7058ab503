use anyhow::Context as AnyhowCtx;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::ops::Deref;

use super::{ExtractionError, FromRequest};
use crate::request::Request;
use crate::result::Result;
use crate::routing::PathArgs;

#[derive(Debug)]
/// Extracts arguments from the matched route and parses them using [`serde`]
///
/// # Example
///
/// One `Args` can extract multiple arguments, as a tuple, a map or a struct. A handler should
/// not be given more than one `Args` argument.
///
/// ```rust
/// use bulkedit::extract::Args;
/// use bulkedit::endpoint::View;
/// use bulkedit::routing::Router;
///
/// fn update_service(Args((release, service)): Args<(u32, String)>) {
///     // ...
/// }
///
/// let router = Router::new()
///     .endpoint("/releases/{release}/services/{service}/", View::new().put(update_service));
/// ```
///
/// # Errors
///
/// If the path arguments cannot be deserialized into the target type, extraction will fail and
/// the request is answered with a 400 status.
pub struct Args<T>(pub T);

// Path arguments are always strings, arguments that look like numbers or booleans are also
// offered as such so they can be deserialized into non string types
fn candidates(args: &PathArgs) -> Vec<Value> {
    let mut values = Vec::new();
    for typed in [false, true] {
        let scalar = |v: &str| {
            if typed {
                if let Ok(value @ (Value::Number(_) | Value::Bool(_))) = serde_json::from_str(v) {
                    return value;
                }
            }
            Value::String(v.to_string())
        };

        if args.len() == 1 {
            values.push(scalar(args[0].1.as_str()));
        }
        values.push(Value::Object(
            args.iter()
                .map(|(k, v)| (k.to_string(), scalar(v.as_str())))
                .collect::<Map<_, _>>(),
        ));
        values.push(Value::Array(
            args.iter().map(|(_, v)| scalar(v.as_str())).collect(),
        ));
    }
    values
}

impl<T: DeserializeOwned> FromRequest for Args<T> {
    fn from_request(request: &Request) -> Result<Self> {
        let args = request.args();
        let mut last_err = None;
        for candidate in candidates(args) {
            match serde_json::from_value::<T>(candidate) {
                Ok(value) => return Ok(Args(value)),
                Err(e) => last_err = Some(e),
            }
        }

        let err = last_err
            .map(anyhow::Error::from)
            .unwrap_or_else(|| anyhow::anyhow!("no arguments to deserialize"));
        Err(err)
            .with_context(|| {
                format!(
                    "Failed to deserialize {args} into {}",
                    std::any::type_name::<T>()
                )
            })
            .map_err(|e| ExtractionError::from(e).into())
    }
}

impl<S> Deref for Args<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
