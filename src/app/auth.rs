use std::collections::HashMap;

use crate::error::{Error, ErrorKind};
use crate::request::RawRequest;
use crate::result::Result;

/// The caller identity established when a request is initialized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    user: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self {
            user: Some(name.into()),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Trait for types that establish the identity of a caller
pub trait Authenticate: Send + Sync + 'static {
    /// Return the identity of the caller
    ///
    /// Requests carrying no credentials should resolve to [`Identity::anonymous`], requests
    /// carrying invalid credentials should fail.
    fn authenticate(&self, request: &RawRequest) -> Result<Identity>;
}

/// Authenticates requests carrying an `Authorization: Token <key>` header
#[derive(Debug, Clone, Default)]
pub struct TokenAuthentication {
    tokens: HashMap<String, String>,
}

impl TokenAuthentication {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for the given user
    pub fn token(mut self, key: impl Into<String>, user: impl Into<String>) -> Self {
        self.tokens.insert(key.into(), user.into());
        self
    }
}

impl Authenticate for TokenAuthentication {
    fn authenticate(&self, request: &RawRequest) -> Result<Identity> {
        let header = match request.header("authorization") {
            Some(header) => header,
            None => return Ok(Identity::anonymous()),
        };

        let key = match header.split_once(' ') {
            Some((scheme, key)) if scheme.eq_ignore_ascii_case("token") => key.trim(),
            // other authentication schemes are not handled here
            _ => return Ok(Identity::anonymous()),
        };

        self.tokens
            .get(key)
            .map(Identity::user)
            .ok_or_else(|| Error::new(ErrorKind::PermissionDenied, "Invalid token."))
    }
}
