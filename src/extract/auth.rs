use super::FromRequest;
use crate::app::Identity;
use crate::request::Request;
use crate::result::Result;

/// Extracts the identity of the caller
///
/// Synthetic requests created for bulk edit actions share the identity of the request that
/// carried the bulk edit.
#[derive(Debug, Clone)]
pub struct Auth(pub Identity);

impl FromRequest for Auth {
    fn from_request(request: &Request) -> Result<Self> {
        Ok(Auth(request.identity().clone()))
    }
}
