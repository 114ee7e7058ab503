use crate::request::Request;

/// A check run by a [View](`super::View`) before calling the handler
///
/// Requests failing a check are answered with a 403 status and the permission message. The
/// check also runs for synthetic requests of a bulk edit, so an action on a protected target
/// fails the same way a direct call would.
pub trait Permission: Send + Sync + 'static {
    fn has_permission(&self, request: &Request) -> bool;

    fn message(&self) -> &str {
        "You do not have permission to perform this action."
    }
}

/// Allow every request
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAny;

impl Permission for AllowAny {
    fn has_permission(&self, _: &Request) -> bool {
        true
    }
}

/// Only allow requests from an authenticated caller
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticated;

impl Permission for IsAuthenticated {
    fn has_permission(&self, request: &Request) -> bool {
        request.identity().is_authenticated()
    }

    fn message(&self) -> &str {
        "Authentication credentials were not provided."
    }
}
