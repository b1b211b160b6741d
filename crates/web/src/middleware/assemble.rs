use std::sync::Arc;

use super::SharedMiddleware;

/// Builds the middleware chain of each route from the scopes it is nested in.
///
/// An assembler carries the chain prefix shared by every route of one owner: the
/// server's global middleware, the server scope and, for a controller, the controller
/// scope. [`assemble`](MiddlewareAssembler::assemble) appends the route's validators and
/// then its own middleware, so the final order is
/// `global, server scope, [controller scope], validators, route middleware`.
#[derive(Clone, Default)]
pub struct MiddlewareAssembler {
    prefix: Vec<SharedMiddleware>,
}

impl MiddlewareAssembler {
    /// Starts from the global middleware, which always runs first.
    pub fn new(global: Vec<SharedMiddleware>) -> Self {
        Self { prefix: global }
    }

    /// Returns an assembler for a nested scope whose middleware runs after this one's.
    #[must_use]
    pub fn scoped(&self, scope: &[SharedMiddleware]) -> Self {
        let mut prefix = Vec::with_capacity(self.prefix.len() + scope.len());
        prefix.extend(self.prefix.iter().cloned());
        prefix.extend(scope.iter().cloned());
        Self { prefix }
    }

    /// The chain shared by every route of this scope, also used by the not-found fallback.
    pub fn prefix(&self) -> &[SharedMiddleware] {
        &self.prefix
    }

    pub fn assemble(&self, validators: &[SharedMiddleware], route: &[SharedMiddleware]) -> Vec<SharedMiddleware> {
        self.prefix.iter().chain(validators).chain(route).map(Arc::clone).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::middleware::middleware_fn;
    use bytes::Bytes;
    use std::sync::Mutex;
    use totea_http::protocol::PathParams;

    fn recorder(log: &Arc<Mutex<String>>, name: &'static str) -> SharedMiddleware {
        let log = Arc::clone(log);
        Arc::new(middleware_fn(move |_ctx: RequestContext| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push_str(name);
                Ok(())
            }
        }))
    }

    #[tokio::test]
    async fn test_scopes_run_outside_in() {
        let log = Arc::new(Mutex::new(String::new()));
        let m = |name| recorder(&log, name);

        let server = MiddlewareAssembler::new(vec![m("A"), m("B")]).scoped(&[m("C"), m("D")]);
        let controller = server.scoped(&[m("G"), m("H")]);

        let ctx = RequestContext::from_http(http::Request::get("/").body(Bytes::new()).unwrap(), PathParams::empty());

        for middleware in server.assemble(&[m("V")], &[m("E"), m("F")]) {
            middleware.handle(&ctx).await.unwrap();
        }
        assert_eq!(log.lock().unwrap().as_str(), "ABCDVEF");

        log.lock().unwrap().clear();
        for middleware in controller.assemble(&[], &[m("E")]) {
            middleware.handle(&ctx).await.unwrap();
        }
        assert_eq!(log.lock().unwrap().as_str(), "ABCDGHE");
        assert_eq!(controller.prefix().len(), 6);
    }
}
