use std::fmt::{Display, Formatter};

use super::FromRequest;
use crate::request::Request;
use crate::result::Result;

/// Extracts the path of the request
///
/// For actions of a bulk edit, this is the path of the action target.
pub struct Path(pub String);

impl FromRequest for Path {
    fn from_request(request: &Request) -> Result<Self> {
        Ok(Path(request.path().to_string()))
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.0
    }
}
