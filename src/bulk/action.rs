use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::{invalid_target, resolve, ResolvedTarget};
use crate::error::{Error, ErrorKind};
use crate::method::Method;
use crate::request::Request;
use crate::result::Result;

/// Field used for errors that do not belong to a specific action field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// The kind of operation an action performs on its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Create a new object, the target is the list endpoint one would POST to
    Create,
    /// Update the object at the target
    Update,
    /// Delete the object at the target
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
        }
    }

    /// The request method the target is called with
    pub fn method(&self) -> Method {
        match self {
            ActionKind::Create => Method::Post,
            ActionKind::Update => Method::Put,
            ActionKind::Delete => Method::Delete,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(ActionKind::Create),
            "update" => Ok(ActionKind::Update),
            "delete" => Ok(ActionKind::Delete),
            _ => Err(Error::field(
                ErrorKind::Schema,
                "action",
                format!("\"{s}\" is not a valid choice."),
            )),
        }
    }
}

/// A validated action, ready to be applied
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub target: ResolvedTarget,
    /// The action value. Always `None` for deletes
    pub payload: Option<Map<String, Value>>,
}

/// Decides which targets an endpoint may edit through a bulk edit
pub trait Containment: Send + Sync + 'static {
    /// Returns true if the target may be edited from the current request
    fn contains(&self, target: &ResolvedTarget, request: &Request) -> bool;
}

impl<F> Containment for F
where
    F: Fn(&ResolvedTarget, &Request) -> bool + Send + Sync + 'static,
{
    fn contains(&self, target: &ResolvedTarget, request: &Request) -> bool {
        (self)(target, request)
    }
}

/// Only allow targets at or below the path of the current endpoint
///
/// An endpoint at `/flobbits/` may edit `/flobbits/` and `/flobbits/1/` but neither `/flobbits`
/// nor `/other/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubResource;

impl Containment for SubResource {
    fn contains(&self, target: &ResolvedTarget, request: &Request) -> bool {
        is_subpath(request.path(), &target.path)
    }
}

fn is_subpath(base: &str, path: &str) -> bool {
    path.starts_with(base)
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn schema_error(field: &str, msg: impl Into<String>) -> Error {
    Error::field(ErrorKind::Schema, field, msg.into())
}

// Look up an optional field, explicit nulls are not accepted
fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<Option<&'a Value>> {
    match fields.get(name) {
        Some(Value::Null) => Err(schema_error(name, "This field may not be null.")),
        value => Ok(value),
    }
}

fn required_when(field: &str, kind: ActionKind) -> Error {
    schema_error(
        field,
        format!("This field is required when action is \"{kind}\""),
    )
}

/// Validate one raw action of a bulk edit
///
/// The action fields are checked first, then the target is resolved (defaulting to the URL of
/// the current request for creates) and must support the action method and pass the
/// containment policy. Validation has no side effects, no endpoint is called.
pub fn validate(raw: &Value, request: &Request, policy: &dyn Containment) -> Result<Action> {
    let fields = raw.as_object().ok_or_else(|| {
        schema_error(
            NON_FIELD_ERRORS,
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type(raw)
            ),
        )
    })?;

    let kind = match field(fields, "action")? {
        Some(Value::String(choice)) => choice.parse::<ActionKind>()?,
        Some(other) => {
            return Err(schema_error(
                "action",
                format!("\"{other}\" is not a valid choice."),
            ))
        }
        None => return Err(schema_error("action", "This field is required.")),
    };

    let url = match field(fields, "url")? {
        Some(Value::String(url)) if url.trim().is_empty() => {
            return Err(schema_error("url", "This field may not be blank."))
        }
        Some(Value::String(url)) => Some(url.as_str()),
        Some(_) => return Err(schema_error("url", "Not a valid string.")),
        None => None,
    };

    let payload = match field(fields, "value")? {
        Some(Value::Object(value)) => Some(value),
        Some(other) => {
            return Err(schema_error(
                "value",
                format!(
                    "Expected a dictionary of items but got type \"{}\".",
                    json_type(other)
                ),
            ))
        }
        None => None,
    };

    if kind != ActionKind::Delete && payload.is_none() {
        return Err(required_when("value", kind));
    }

    let url = match url {
        Some(url) => url,
        None if kind == ActionKind::Create => request.url().as_str(),
        None => return Err(required_when("url", kind)),
    };

    let target = resolve(url, request)?;

    let method = kind.method();
    if !target.endpoint.allowed_methods().contains(&method) {
        return Err(Error::field(
            ErrorKind::UnsupportedAction,
            "url",
            format!("Action \"{kind}\" is not supported by the URL target: {url}"),
        ));
    }

    if !policy.contains(&target, request) {
        debug!(url, "target is outside of the current endpoint");
        return Err(invalid_target(url));
    }

    debug!(action = %kind, path = %target.path, "action validated");
    Ok(Action {
        kind,
        target,
        payload: match kind {
            ActionKind::Delete => None,
            _ => payload.cloned(),
        },
    })
}
