//! Route and middleware declarations of one owner tier.
//!
//! A server or controller is described by two [`Declarations`]: the class defaults given
//! to `routes()` and the instance overrides given to `instance_routes()`. Declaring
//! never fails; conflicts are reported when the owner is built.
//!
//! ```
//! use totea_web::metadata::Declarations;
//! use totea_web::validator::Validator;
//! use totea_web::{RequestContext, handler_fn};
//!
//! let routes = Declarations::new()
//!     .get("/user/:id", "getUser", handler_fn(|ctx: RequestContext| async move {
//!         ctx.param("id").unwrap_or_default().to_owned()
//!     }))
//!     .post("/user", "addUser", handler_fn(|ctx: RequestContext| async move { ctx.body().clone() }))
//!     .validate("addUser", Validator::body(|body| body.get("name").is_some()));
//! ```

use std::fmt;
use std::sync::Arc;

use http::Method;
use totea_http::route::RoutePath;

use crate::handler::RouteHandler;
use crate::middleware::{Middleware, SharedMiddleware};
use crate::naming::default_route_path;
use crate::route::RouteEntry;
use crate::validator::Validator;

#[derive(Clone, Default)]
pub struct Declarations {
    pub(crate) routes: Vec<RouteEntry>,
    pub(crate) overrides: Vec<String>,
    pub(crate) middleware: Vec<SharedMiddleware>,
    pub(crate) route_middleware: Vec<(String, SharedMiddleware)>,
    pub(crate) validators: Vec<(String, SharedMiddleware)>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<H>(self, path: impl Into<RoutePath>, name: impl Into<String>, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        self.route(Method::GET, path, name, handler)
    }

    pub fn post<H>(self, path: impl Into<RoutePath>, name: impl Into<String>, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        self.route(Method::POST, path, name, handler)
    }

    pub fn put<H>(self, path: impl Into<RoutePath>, name: impl Into<String>, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        self.route(Method::PUT, path, name, handler)
    }

    pub fn patch<H>(self, path: impl Into<RoutePath>, name: impl Into<String>, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        self.route(Method::PATCH, path, name, handler)
    }

    pub fn delete<H>(self, path: impl Into<RoutePath>, name: impl Into<String>, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        self.route(Method::DELETE, path, name, handler)
    }

    pub fn route<H>(self, method: Method, path: impl Into<RoutePath>, name: impl Into<String>, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        self.route_shared(method, path, name, Arc::new(handler))
    }

    /// Declares a route whose handler is already shared. Binding the same `Arc` twice is
    /// a duplicate handler even under different names.
    pub fn route_shared(
        mut self,
        method: Method,
        path: impl Into<RoutePath>,
        name: impl Into<String>,
        handler: Arc<dyn RouteHandler>,
    ) -> Self {
        self.routes.push(RouteEntry::new(method, path, name, handler));
        self
    }

    /// Declares a route at `/` + the kebab-cased handler name: `getAddress` is served at
    /// `/get-address`.
    pub fn route_named<H>(self, method: Method, name: impl Into<String>, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        let name = name.into();
        let path = default_route_path(&name);
        self.route(method, path, name, handler)
    }

    /// Allows the routes of `name` to replace an earlier route bound to the same
    /// `(method, path)`. May be declared before or after the route itself.
    pub fn mark_override(mut self, name: impl Into<String>) -> Self {
        self.overrides.push(name.into());
        self
    }

    /// Adds scope middleware, run for every route of the owner.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Adds middleware run only for the routes of handler `name`, after its validators.
    pub fn route_middleware<M: Middleware + 'static>(mut self, name: impl Into<String>, middleware: M) -> Self {
        self.route_middleware.push((name.into(), Arc::new(middleware)));
        self
    }

    pub fn validate(mut self, name: impl Into<String>, validator: Validator) -> Self {
        self.validators.push((name.into(), Arc::new(validator)));
        self
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
            && self.middleware.is_empty()
            && self.route_middleware.is_empty()
            && self.validators.is_empty()
    }
}

impl fmt::Debug for Declarations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = |items: &[(String, SharedMiddleware)]| items.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>();
        f.debug_struct("Declarations")
            .field("routes", &self.routes)
            .field("overrides", &self.overrides)
            .field("middleware", &self.middleware.len())
            .field("route_middleware", &keys(&self.route_middleware))
            .field("validators", &keys(&self.validators))
            .finish()
    }
}
