//! Middleware run ahead of a route handler, and error middleware run after a failure.
//!
//! A [`Middleware`] returns `Ok(())` to let the chain continue and `Err(_)` to short
//! circuit it; the error then goes to the server's error stage. A middleware that writes
//! the response itself also stops the chain.

mod assemble;
mod logger;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::HandlerError;

pub use assemble::MiddlewareAssembler;
pub use logger::RequestLogger;

pub type SharedMiddleware = Arc<dyn Middleware>;
pub type SharedErrorMiddleware = Arc<dyn ErrorMiddleware>;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &RequestContext) -> Result<(), HandlerError>;
}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn handle(&self, ctx: &RequestContext) -> Result<(), HandlerError> {
        (**self).handle(ctx).await
    }
}

/// Handles or passes on an error produced by a middleware chain.
///
/// Returning `Ok(())` marks the error as handled: the middleware is expected to have
/// written a response. If it did not, the default envelope writer answers with the
/// error it was given. Returning `Err(error)` hands the (possibly different) error to
/// the next error middleware, and finally to the default envelope writer.
#[async_trait]
pub trait ErrorMiddleware: Send + Sync {
    async fn handle(&self, error: HandlerError, ctx: &RequestContext) -> Result<(), HandlerError>;
}

pub struct MiddlewareFn<F> {
    f: F,
}

/// Turns an async closure into a [`Middleware`]. The closure gets its own clone of the context.
pub fn middleware_fn<F, Fut>(f: F) -> MiddlewareFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    MiddlewareFn { f }
}

#[async_trait]
impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, ctx: &RequestContext) -> Result<(), HandlerError> {
        (self.f)(ctx.clone()).await
    }
}

pub struct ErrorMiddlewareFn<F> {
    f: F,
}

/// Turns an async closure into an [`ErrorMiddleware`].
pub fn error_middleware_fn<F, Fut>(f: F) -> ErrorMiddlewareFn<F>
where
    F: Fn(HandlerError, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    ErrorMiddlewareFn { f }
}

#[async_trait]
impl<F, Fut> ErrorMiddleware for ErrorMiddlewareFn<F>
where
    F: Fn(HandlerError, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, error: HandlerError, ctx: &RequestContext) -> Result<(), HandlerError> {
        (self.f)(error, ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use bytes::Bytes;
    use http::StatusCode;
    use totea_http::protocol::PathParams;

    fn ctx(uri: &str) -> RequestContext {
        RequestContext::from_http(http::Request::get(uri).body(Bytes::new()).unwrap(), PathParams::empty())
    }

    #[tokio::test]
    async fn test_middleware_fn() {
        let guard = middleware_fn(|ctx: RequestContext| async move {
            if ctx.path() == "/admin" {
                return Err(HandlerError::from(HttpError::new(StatusCode::FORBIDDEN)));
            }
            Ok(())
        });

        assert!(guard.handle(&ctx("/user")).await.is_ok());
        let error = guard.handle(&ctx("/admin")).await.unwrap_err();
        assert_eq!(error.into_http().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_error_middleware_fn_can_transform() {
        let rewrite = error_middleware_fn(|error: HandlerError, _ctx: RequestContext| async move {
            let http = error.into_http();
            let wrapped = HttpError::with_message(http.status(), format!("wrapped: {}", http.message()));
            Err::<(), _>(HandlerError::from(wrapped))
        });

        let error = rewrite.handle(HttpError::not_found().into(), &ctx("/")).await.unwrap_err();
        assert_eq!(error.into_http().message(), "wrapped: Not Found");
    }
}
