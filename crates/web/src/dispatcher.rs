//! Invocation of route handlers and the per-route pipeline around them.
//!
//! A [`HandlerChain`] is what gets registered with the transport for each route. It
//! builds the [`RequestContext`], runs the route's middleware in order, hands the
//! request to the [`Dispatcher`] and routes every failure through the [`ErrorStage`],
//! so each request ends in exactly one envelope.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use totea_http::handler::Endpoint;
use totea_http::protocol::{Request, ResponseHandle};
use tracing::{Instrument, debug, error, info_span, warn};

use crate::context::RequestContext;
use crate::envelope::{Envelope, OnResponse};
use crate::error::{HandlerError, HttpError};
use crate::handler::RouteHandler;
use crate::middleware::{SharedErrorMiddleware, SharedMiddleware};
use crate::peers::Peers;
use crate::responder::Reply;

/// Where a dispatch ended.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The handler's reply was normalized into an envelope that still has to be written.
    Responded(Envelope),
    /// The handler wrote the response itself.
    AlreadySent,
    /// The handler failed, or replied with an error; the error stage takes over.
    Forwarded(HandlerError),
}

/// Wraps a route handler and normalizes what it returns.
#[derive(Clone)]
pub struct Dispatcher {
    handler: Arc<dyn RouteHandler>,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn RouteHandler>) -> Self {
        Self { handler }
    }

    pub async fn dispatch(&self, ctx: RequestContext) -> DispatchOutcome {
        let response = ctx.response().clone();
        let invoked = AssertUnwindSafe(self.handler.invoke(ctx)).catch_unwind().await;

        let reply = match invoked {
            Ok(Ok(reply)) => reply,
            Ok(Err(error)) => return DispatchOutcome::Forwarded(error),
            Err(_) => {
                error!("route handler panicked");
                return DispatchOutcome::Forwarded(HandlerError::unexpected("route handler panicked"));
            }
        };

        if response.is_sent().await {
            return DispatchOutcome::AlreadySent;
        }

        match normalize(reply) {
            Ok(envelope) => DispatchOutcome::Responded(envelope),
            Err(error) => DispatchOutcome::Forwarded(HandlerError::Http(error)),
        }
    }
}

/// Turns a handler reply into the envelope to write, or the error to forward.
pub fn normalize(reply: Reply) -> Result<Envelope, HttpError> {
    match reply {
        Reply::Empty => Err(HttpError::internal()),
        Reply::Error(error) => Err(error),
        Reply::Envelope(envelope) => Ok(envelope),
        Reply::Value(Value::Object(object)) if Envelope::is_spreadable(&object) => Ok(Envelope::spread(object)),
        Reply::Value(value) => Ok(Envelope::ok(value)),
    }
}

/// Handles errors that left a chain: error middleware first, then the envelope writer.
#[derive(Clone)]
pub struct ErrorStage {
    middleware: Vec<SharedErrorMiddleware>,
    on_response: Arc<dyn OnResponse>,
}

impl ErrorStage {
    pub fn new(middleware: Vec<SharedErrorMiddleware>, on_response: Arc<dyn OnResponse>) -> Self {
        Self { middleware, on_response }
    }

    /// Runs the error middleware in order, then writes the error envelope.
    ///
    /// An error middleware that returns `Ok` without writing a response does not end the
    /// request; the envelope writer still answers with the error it was given.
    pub async fn handle(&self, error: HandlerError, ctx: &RequestContext) {
        let mut error = error;
        for middleware in &self.middleware {
            let shown = error.to_http();
            match guarded("error middleware", middleware.handle(error, ctx)).await {
                Ok(()) if ctx.response().is_sent().await => return,
                Ok(()) => {
                    warn!(status = %shown.status(), "error middleware returned without responding");
                    error = HandlerError::Http(shown);
                    break;
                }
                Err(next) => error = next,
            }
        }

        if let HandlerError::Unexpected(cause) = &error {
            error!(cause = %cause, "unexpected error while handling request");
        }

        if ctx.response().is_sent().await {
            debug!(error = %error, "response already sent, dropping error");
            return;
        }

        let envelope = Envelope::from(error.into_http());
        if let Err(e) = self.on_response.on_response(envelope, ctx.response()).await {
            warn!(cause = %e, "failed to write error envelope");
        }
    }
}

enum Terminal {
    Dispatch(Dispatcher),
    NotFound,
}

/// The [`Endpoint`] registered for one route, or for the not-found fallback.
pub struct HandlerChain {
    name: String,
    middleware: Vec<SharedMiddleware>,
    terminal: Terminal,
    on_response: Arc<dyn OnResponse>,
    error_stage: ErrorStage,
    peers: Peers,
}

impl HandlerChain {
    pub(crate) fn route(
        name: &str,
        middleware: Vec<SharedMiddleware>,
        handler: Arc<dyn RouteHandler>,
        on_response: Arc<dyn OnResponse>,
        error_stage: ErrorStage,
        peers: Peers,
    ) -> Self {
        let terminal = Terminal::Dispatch(Dispatcher::new(handler));
        Self { name: name.to_owned(), middleware, terminal, on_response, error_stage, peers }
    }

    /// A chain that runs `middleware` and then answers `404 Not Found`.
    pub(crate) fn not_found(
        middleware: Vec<SharedMiddleware>,
        on_response: Arc<dyn OnResponse>,
        error_stage: ErrorStage,
        peers: Peers,
    ) -> Self {
        Self { name: "notFound".to_owned(), middleware, terminal: Terminal::NotFound, on_response, error_stage, peers }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs the chain for an already built context.
    pub async fn run(&self, ctx: RequestContext) {
        let start = Instant::now();
        if let Err(error) = self.drive(&ctx).await {
            self.error_stage.handle(error, &ctx).await;
        }
        debug!(elapsed = ?start.elapsed(), "request finished");
    }

    async fn drive(&self, ctx: &RequestContext) -> Result<(), HandlerError> {
        if let Some(error) = ctx.body_error() {
            return Err(HandlerError::Http(error.clone()));
        }

        for middleware in &self.middleware {
            guarded("middleware", middleware.handle(ctx)).await?;
            if ctx.response().is_sent().await {
                debug!("middleware sent the response, stopping chain");
                return Ok(());
            }
        }

        let dispatcher = match &self.terminal {
            Terminal::Dispatch(dispatcher) => dispatcher,
            Terminal::NotFound => return Err(HandlerError::Http(HttpError::not_found())),
        };

        match dispatcher.dispatch(ctx.clone()).await {
            DispatchOutcome::Responded(envelope) => {
                if let Err(e) = self.on_response.on_response(envelope, ctx.response()).await {
                    warn!(cause = %e, "failed to write response envelope");
                }
                Ok(())
            }
            DispatchOutcome::AlreadySent => Ok(()),
            DispatchOutcome::Forwarded(error) => Err(error),
        }
    }
}

/// Awaits one step of the pipeline, turning a panic into an unexpected error.
async fn guarded<F>(stage: &'static str, step: F) -> Result<(), HandlerError>
where
    F: Future<Output = Result<(), HandlerError>>,
{
    AssertUnwindSafe(step).catch_unwind().await.unwrap_or_else(|_| {
        error!(stage, "panicked while handling request");
        Err(HandlerError::unexpected(format!("{stage} panicked")))
    })
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terminal = match self.terminal {
            Terminal::Dispatch(_) => "dispatch",
            Terminal::NotFound => "not found",
        };
        f.debug_struct("HandlerChain")
            .field("name", &self.name)
            .field("middleware", &self.middleware.len())
            .field("terminal", &terminal)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Endpoint for HandlerChain {
    async fn call(&self, request: Arc<Request>, response: ResponseHandle) {
        let span = info_span!("request", method = %request.method(), path = request.path(), handler = self.name);
        let ctx = RequestContext::new(request, response, self.peers.clone());
        self.run(ctx).instrument(span).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::JsonEnvelope;
    use crate::handler::handler_fn;
    use crate::middleware::{error_middleware_fn, middleware_fn};
    use bytes::Bytes;
    use http::StatusCode;
    use serde_json::json;
    use totea_http::protocol::PathParams;

    fn ctx() -> RequestContext {
        RequestContext::from_http(http::Request::get("/").body(Bytes::new()).unwrap(), PathParams::empty())
    }

    fn chain(middleware: Vec<SharedMiddleware>, handler: Arc<dyn RouteHandler>, errors: ErrorStage) -> HandlerChain {
        HandlerChain::route("test", middleware, handler, Arc::new(JsonEnvelope::new()), errors, Peers::detached())
    }

    fn default_errors() -> ErrorStage {
        ErrorStage::new(vec![], Arc::new(JsonEnvelope::new()))
    }

    async fn written(ctx: &RequestContext) -> Value {
        let response = ctx.response().take().await.expect("a response was written");
        serde_json::from_slice(response.body()).unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Reply::Value(json!("ok"))).unwrap(), Envelope::ok(json!("ok")));
        assert_eq!(normalize(Reply::Empty).unwrap_err(), HttpError::internal());

        let error = HttpError::with_message(StatusCode::NOT_ACCEPTABLE, "not acceptable here");
        assert_eq!(normalize(Reply::Error(error.clone())).unwrap_err(), error);

        let spread = normalize(Reply::Value(json!({"status": 201, "result": [1]}))).unwrap();
        assert_eq!(spread.status(), 201);
        assert_eq!(spread.message(), "Created");

        let wrapped = normalize(Reply::Value(json!({"id": 1}))).unwrap();
        assert_eq!(wrapped.result(), Some(&json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_dispatch_outcomes() {
        let dispatcher = Dispatcher::new(Arc::new(handler_fn(|_ctx: RequestContext| async { "ok" })));
        assert!(matches!(dispatcher.dispatch(ctx()).await, DispatchOutcome::Responded(_)));

        let dispatcher = Dispatcher::new(Arc::new(handler_fn(|ctx: RequestContext| async move {
            ctx.response().text(StatusCode::OK, "by hand").await.unwrap();
            "ignored"
        })));
        assert!(matches!(dispatcher.dispatch(ctx()).await, DispatchOutcome::AlreadySent));

        let dispatcher = Dispatcher::new(Arc::new(handler_fn(|_ctx: RequestContext| async {})));
        assert!(matches!(dispatcher.dispatch(ctx()).await, DispatchOutcome::Forwarded(HandlerError::Http(_))));
    }

    #[tokio::test]
    async fn test_panicking_handler_is_masked() {
        let handler = Arc::new(handler_fn(|ctx: RequestContext| async move {
            if ctx.path() == "/" {
                panic!("boom");
            }
            "unreachable"
        }));

        let ctx = ctx();
        chain(vec![], handler, default_errors()).run(ctx.clone()).await;
        assert_eq!(written(&ctx).await, json!({"status": 500, "message": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let reject: SharedMiddleware = Arc::new(middleware_fn(|_ctx: RequestContext| async {
            Err::<(), _>(HandlerError::from(HttpError::from_code(401)))
        }));
        let handler = Arc::new(handler_fn(|_ctx: RequestContext| async { "never" }));

        let ctx = ctx();
        chain(vec![reject], handler, default_errors()).run(ctx.clone()).await;
        assert_eq!(written(&ctx).await, json!({"status": 401, "message": "Unauthorized"}));
    }

    #[tokio::test]
    async fn test_middleware_that_responds_stops_chain() {
        let respond: SharedMiddleware = Arc::new(middleware_fn(|ctx: RequestContext| async move {
            ctx.response().text(StatusCode::OK, "cached").await?;
            Ok::<(), HandlerError>(())
        }));
        let handler = Arc::new(handler_fn(|_ctx: RequestContext| async { "never" }));

        let ctx = ctx();
        chain(vec![respond], handler, default_errors()).run(ctx.clone()).await;
        let response = ctx.response().take().await.unwrap();
        assert_eq!(response.body().as_ref(), b"cached");
    }

    #[tokio::test]
    async fn test_error_middleware_can_handle() {
        let handled = error_middleware_fn(|error: HandlerError, ctx: RequestContext| async move {
            let status = error.into_http().status();
            ctx.response().text(status, "handled").await?;
            Ok::<(), HandlerError>(())
        });
        let errors = ErrorStage::new(vec![Arc::new(handled)], Arc::new(JsonEnvelope::new()));
        let handler = Arc::new(handler_fn(|_ctx: RequestContext| async { HttpError::from_code(418) }));

        let ctx = ctx();
        chain(vec![], handler, errors).run(ctx.clone()).await;
        let response = ctx.response().take().await.unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.body().as_ref(), b"handled");
    }

    #[tokio::test]
    async fn test_panicking_middleware_is_masked() {
        let boom: SharedMiddleware = Arc::new(middleware_fn(|ctx: RequestContext| async move {
            if ctx.path() == "/" {
                panic!("middleware boom");
            }
            Ok::<(), HandlerError>(())
        }));
        let handler = Arc::new(handler_fn(|_ctx: RequestContext| async { "never" }));

        let ctx = ctx();
        chain(vec![boom], handler, default_errors()).run(ctx.clone()).await;
        assert_eq!(written(&ctx).await, json!({"status": 500, "message": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_error_middleware_without_response_falls_through() {
        let silent =
            error_middleware_fn(|_error: HandlerError, _ctx: RequestContext| async { Ok::<(), HandlerError>(()) });
        let errors = ErrorStage::new(vec![Arc::new(silent)], Arc::new(JsonEnvelope::new()));
        let handler = Arc::new(handler_fn(|_ctx: RequestContext| async { HttpError::from_code(403) }));

        let ctx = ctx();
        chain(vec![], handler, errors).run(ctx.clone()).await;
        assert_eq!(written(&ctx).await, json!({"status": 403, "message": "Forbidden"}));
    }

    #[tokio::test]
    async fn test_panicking_error_middleware_is_masked() {
        let boom = error_middleware_fn(|error: HandlerError, ctx: RequestContext| async move {
            if ctx.path() == "/" {
                panic!("error middleware boom");
            }
            Err::<(), _>(error)
        });
        let errors = ErrorStage::new(vec![Arc::new(boom)], Arc::new(JsonEnvelope::new()));
        let handler = Arc::new(handler_fn(|_ctx: RequestContext| async { HttpError::from_code(403) }));

        let ctx = ctx();
        chain(vec![], handler, errors).run(ctx.clone()).await;
        assert_eq!(written(&ctx).await, json!({"status": 500, "message": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_not_found_chain() {
        let ctx = ctx();
        HandlerChain::not_found(vec![], Arc::new(JsonEnvelope::new()), default_errors(), Peers::detached())
            .run(ctx.clone())
            .await;
        assert_eq!(written(&ctx).await, json!({"status": 404, "message": "Not Found"}));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let request = http::Request::post("/")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(b"{"))
            .unwrap();
        let ctx = RequestContext::from_http(request, PathParams::empty());
        let handler = Arc::new(handler_fn(|_ctx: RequestContext| async { "never" }));

        chain(vec![], handler, default_errors()).run(ctx.clone()).await;
        assert_eq!(written(&ctx).await["status"], 400);
    }
}
