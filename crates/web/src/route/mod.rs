//! Route declarations and the three steps that turn them into a table:
//! [`registry`] checks one tier for conflicts, [`merge`](merge::merge) layers the
//! instance tier over the class tier (after which
//! [`ensure_unique_handlers`](registry::ensure_unique_handlers) checks the union), and
//! [`order`](order::order) puts specific paths first.

pub mod merge;
pub mod order;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use http::Method;
use totea_http::route::RoutePath;

use crate::handler::RouteHandler;

pub use merge::merge;
pub use order::order;
pub use registry::{RouteRegistry, ensure_unique_handlers};

/// One declared route: `method path -> handler`.
#[derive(Clone)]
pub struct RouteEntry {
    method: Method,
    path: RoutePath,
    handler: Arc<dyn RouteHandler>,
    handler_name: String,
}

impl RouteEntry {
    pub fn new(
        method: Method,
        path: impl Into<RoutePath>,
        handler_name: impl Into<String>,
        handler: Arc<dyn RouteHandler>,
    ) -> Self {
        Self { method, path: path.into(), handler, handler_name: handler_name.into() }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &RoutePath {
        &self.path
    }

    pub fn handler(&self) -> &Arc<dyn RouteHandler> {
        &self.handler
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// True when both entries bind the same `(method, path)`.
    pub fn same_binding(&self, other: &RouteEntry) -> bool {
        self.method == other.method && self.path == other.path
    }

    /// True when both entries point at the same handler, by name or by identity.
    pub fn same_handler(&self, other: &RouteEntry) -> bool {
        self.handler_name == other.handler_name || Arc::ptr_eq(&self.handler, &other.handler)
    }

    /// Re-roots the entry's path under a controller prefix.
    #[must_use]
    pub fn mount(mut self, prefix: &str) -> Self {
        self.path = self.path.mount(prefix);
        self
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &format_args!("{}", self.path))
            .field("handler_name", &self.handler_name)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use http::Method;

    use super::RouteEntry;
    use crate::context::RequestContext;
    use crate::handler::{RouteHandler, handler_fn};

    pub(crate) fn noop() -> Arc<dyn RouteHandler> {
        Arc::new(handler_fn(|_ctx: RequestContext| async { "ok" }))
    }

    pub(crate) fn entry(method: Method, path: &str, name: &str) -> RouteEntry {
        RouteEntry::new(method, path, name, noop())
    }

    pub(crate) fn names(entries: &[RouteEntry]) -> Vec<&str> {
        entries.iter().map(RouteEntry::handler_name).collect()
    }
}
