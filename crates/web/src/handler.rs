use std::future::Future;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::responder::{Reply, Responder};

/// The business logic behind a route.
///
/// A handler receives the request context and produces a [`Reply`], or an error that is
/// forwarded to the error stage. It may also write the response itself through
/// [`RequestContext::response`]; the dispatcher then leaves the response alone.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn invoke(&self, ctx: RequestContext) -> Result<Reply, HandlerError>;
}

/// a handler holder which represents any async `Fn(RequestContext)`
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    fn new(f: F) -> Self {
        Self { f }
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future + Send,
    Fut::Output: Responder,
{
    FnHandler::new(f)
}

#[async_trait]
impl<F, Fut> RouteHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future + Send,
    Fut::Output: Responder,
{
    async fn invoke(&self, ctx: RequestContext) -> Result<Reply, HandlerError> {
        (self.f)(ctx).await.into_reply()
    }
}
