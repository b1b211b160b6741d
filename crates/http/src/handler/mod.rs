use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::protocol::{Request, ResponseHandle};

/// The unit the transport dispatches a matched request to.
///
/// An endpoint answers through the [`ResponseHandle`]; whatever it does not write is
/// reported by the transport as an empty `500`.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, request: Arc<Request>, response: ResponseHandle);
}

#[derive(Debug)]
pub struct EndpointFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Endpoint for EndpointFn<F>
where
    F: Fn(Arc<Request>, ResponseHandle) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn call(&self, request: Arc<Request>, response: ResponseHandle) {
        (self.f)(request, response).await;
    }
}

/// Turns an async closure into an [`Endpoint`].
pub fn endpoint_fn<F, Fut>(f: F) -> EndpointFn<F>
where
    F: Fn(Arc<Request>, ResponseHandle) -> Fut,
    Fut: Future<Output = ()>,
{
    EndpointFn { f }
}
