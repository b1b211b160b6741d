use async_trait::async_trait;
use tracing::{Level, debug, event};

use super::Middleware;
use crate::context::RequestContext;
use crate::error::HandlerError;

/// Logs each request line together with its path parameters and parsed body.
///
/// The time spent on the whole chain is logged by the chain itself when it finishes.
#[derive(Debug, Clone, Copy)]
pub struct RequestLogger {
    level: Level,
}

impl RequestLogger {
    pub fn new() -> Self {
        Self { level: Level::INFO }
    }

    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, ctx: &RequestContext) -> Result<(), HandlerError> {
        let params = ctx.path_params_value();
        let body = ctx.body();

        // `event!` needs a constant level
        match self.level {
            Level::ERROR => event!(Level::ERROR, method = %ctx.method(), path = ctx.path(), %params, %body, "request"),
            Level::WARN => event!(Level::WARN, method = %ctx.method(), path = ctx.path(), %params, %body, "request"),
            Level::INFO => event!(Level::INFO, method = %ctx.method(), path = ctx.path(), %params, %body, "request"),
            Level::DEBUG => event!(Level::DEBUG, method = %ctx.method(), path = ctx.path(), %params, %body, "request"),
            _ => event!(Level::TRACE, method = %ctx.method(), path = ctx.path(), %params, %body, "request"),
        }

        if let Some(query) = ctx.request().query() {
            debug!(query, "request query");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use totea_http::protocol::PathParams;

    #[tokio::test]
    async fn test_logger_never_blocks_the_chain() {
        let subscriber = tracing_subscriber::FmtSubscriber::builder().with_max_level(Level::TRACE).finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let request = http::Request::post("/user?debug=1")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(br#"{"name":"leo"}"#))
            .unwrap();
        let ctx = RequestContext::from_http(request, PathParams::empty());

        assert!(RequestLogger::new().handle(&ctx).await.is_ok());
        assert!(RequestLogger::new().level(Level::TRACE).handle(&ctx).await.is_ok());
    }
}
