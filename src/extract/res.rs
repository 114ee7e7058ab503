use std::ops::Deref;
use std::sync::Arc;

use super::FromRequest;
use crate::error::Error;
use crate::request::Request;
use crate::result::Result;

/// Extracts a shared application resource
///
/// This extractor will look for a resource of type `<R>` in the [App](`crate::app::App`) and
/// provides read-only access to it. Extraction fails with an internal error if the resource was
/// never provided, as this is a bug in the application set-up.
///
/// # Example
///
/// ```rust
/// use bulkedit::app::App;
/// use bulkedit::endpoint::View;
/// use bulkedit::extract::Res;
/// use bulkedit::routing::Router;
///
/// // A shared resource type
/// struct MyConnection {/* ... */};
///
/// fn list(conn: Res<MyConnection>) {
///     // a reference to the resource configured in the App below
///     // can be accessed from the handler
/// }
///
/// let app = App::new(Router::new().endpoint("/flobbits/", View::new().get(list)))
///     .resource(MyConnection {/* .. */});
/// ```
///
/// There is nothing that prevents you from making a resource editable behind a `RwLock`,
/// [Store](`crate::store::Store`) does exactly that.
#[derive(Debug)]
pub struct Res<R>(Arc<R>);

impl<R: Send + Sync + 'static> FromRequest for Res<R> {
    fn from_request(request: &Request) -> Result<Self> {
        request
            .app()
            .resources()
            .get::<R>()
            .map(Res)
            .ok_or_else(|| {
                Error::internal(format!(
                    "resource {} not found",
                    std::any::type_name::<R>()
                ))
            })
    }
}

impl<R> Clone for Res<R> {
    fn clone(&self) -> Self {
        Res(Arc::clone(&self.0))
    }
}

impl<R> Deref for Res<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
