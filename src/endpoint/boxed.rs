use std::marker::PhantomData;
use std::sync::Arc;

use super::Handler;
use crate::request::Request;
use crate::response::Response;
use crate::result::Result;

/// A type erased handler, so views can store handlers with different extractors
#[derive(Clone)]
pub(crate) struct BoxedHandler(Arc<dyn ErasedHandler>);

impl BoxedHandler {
    pub fn from_handler<H, T>(handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        Self(Arc::new(MakeErasedHandler {
            handler,
            _marker: PhantomData,
        }))
    }

    pub fn call(&self, request: &Request) -> Result<Response> {
        self.0.call(request)
    }
}

trait ErasedHandler: Send + Sync {
    fn call(&self, request: &Request) -> Result<Response>;
}

struct MakeErasedHandler<H, T> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<H, T> ErasedHandler for MakeErasedHandler<H, T>
where
    H: Handler<T>,
    T: 'static,
{
    fn call(&self, request: &Request) -> Result<Response> {
        self.handler.call(request)
    }
}
