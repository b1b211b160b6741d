//! The root owner: builds every route chain and hands them to a transport.
//!
//! ```
//! use totea_http::route::RouteTable;
//! use totea_web::metadata::Declarations;
//! use totea_web::{RequestContext, Server, handler_fn};
//!
//! let mut server = Server::builder()
//!     .routes(Declarations::new().get("/", "root", handler_fn(|_ctx: RequestContext| async { "hello" })))
//!     .build()
//!     .unwrap();
//!
//! let mut table = RouteTable::new();
//! server.assign(&mut table).unwrap();
//! assert!(table.is_sealed());
//! ```

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::Arc;

use http::Method;
use totea_http::handler::Endpoint;
use totea_http::route::RoutePath;
use totea_http::transport::Transport;
use tracing::{debug, info};

use crate::controller::Controller;
use crate::dispatcher::{ErrorStage, HandlerChain};
use crate::envelope::{JsonEnvelope, OnResponse};
use crate::error::{RegistrationError, StartupError};
use crate::metadata::Declarations;
use crate::middleware::{ErrorMiddleware, Middleware, MiddlewareAssembler, SharedErrorMiddleware, SharedMiddleware};
use crate::peers::{PeerMap, Peers, SharedState};
use crate::scope::Scope;

/// Constructor options of a server.
///
/// Every field is optional so that two option sets can be layered with
/// [`merge`](ServerOptions::merge): a field set on the overriding side replaces the
/// default one as a whole.
#[derive(Clone, Default)]
pub struct ServerOptions {
    middleware: Option<Vec<SharedMiddleware>>,
    error_middleware: Option<Vec<SharedErrorMiddleware>>,
    on_response: Option<Arc<dyn OnResponse>>,
    silence: Option<bool>,
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends global middleware. Global middleware runs first in every chain,
    /// controllers and the not-found fallback included.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.get_or_insert_with(Vec::new).push(Arc::new(middleware));
        self
    }

    /// Appends error middleware, run in order before the default envelope writer.
    pub fn error_middleware<M: ErrorMiddleware + 'static>(mut self, middleware: M) -> Self {
        self.error_middleware.get_or_insert_with(Vec::new).push(Arc::new(middleware));
        self
    }

    /// Replaces the hook that writes envelopes; defaults to [`JsonEnvelope`].
    pub fn on_response<H: OnResponse + 'static>(mut self, on_response: H) -> Self {
        self.on_response = Some(Arc::new(on_response));
        self
    }

    /// Logs route registration at `debug` instead of `info`.
    pub fn silence(mut self, silence: bool) -> Self {
        self.silence = Some(silence);
        self
    }

    /// Field-wise merge, `overrides` winning.
    pub fn merge(defaults: ServerOptions, overrides: ServerOptions) -> ServerOptions {
        ServerOptions {
            middleware: overrides.middleware.or(defaults.middleware),
            error_middleware: overrides.error_middleware.or(defaults.error_middleware),
            on_response: overrides.on_response.or(defaults.on_response),
            silence: overrides.silence.or(defaults.silence),
        }
    }
}

impl fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerOptions")
            .field("middleware", &self.middleware.as_ref().map(Vec::len))
            .field("error_middleware", &self.error_middleware.as_ref().map(Vec::len))
            .field("on_response", &self.on_response.is_some())
            .field("silence", &self.silence)
            .finish()
    }
}

pub struct ServerBuilder {
    options: ServerOptions,
    config: ServerOptions,
    routes: Declarations,
    instance_routes: Declarations,
    controllers: Vec<Controller>,
    state: Option<SharedState>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            options: ServerOptions::new(),
            config: ServerOptions::new(),
            routes: Declarations::new(),
            instance_routes: Declarations::new(),
            controllers: vec![],
            state: None,
        }
    }

    /// Class level options, the defaults of every instance.
    pub fn options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Instance level options, merged over [`options`](Self::options).
    pub fn configure(mut self, config: ServerOptions) -> Self {
        self.config = config;
        self
    }

    pub fn routes(mut self, routes: Declarations) -> Self {
        self.routes = routes;
        self
    }

    pub fn instance_routes(mut self, routes: Declarations) -> Self {
        self.instance_routes = routes;
        self
    }

    /// Mounts a controller. Controllers are registered after the server's own routes,
    /// in the order they were added.
    pub fn controller(mut self, controller: Controller) -> Self {
        self.controllers.push(controller);
        self
    }

    /// State reachable from any request through `ctx.peers().server::<T>()`.
    pub fn state<T: Any + Send + Sync>(mut self, state: Arc<T>) -> Self {
        self.state = Some(state);
        self
    }

    /// Resolves every scope and assembles the chain of every route.
    pub fn build(self) -> Result<Server, RegistrationError> {
        let options = ServerOptions::merge(self.options, self.config);
        let silence = options.silence.unwrap_or(false);
        let on_response = options.on_response.unwrap_or_else(|| Arc::new(JsonEnvelope::new()));
        let parts = ChainParts {
            error_stage: ErrorStage::new(options.error_middleware.unwrap_or_default(), Arc::clone(&on_response)),
            on_response,
            peers: Peers::detached(),
        };

        let server_scope = Scope::resolve(self.routes, self.instance_routes)?;

        let mut urls = HashSet::new();
        let mut peer_map = PeerMap::new(self.state);
        let mut controllers = Vec::with_capacity(self.controllers.len());
        for mut controller in self.controllers {
            if !urls.insert(controller.url().to_owned()) {
                return Err(RegistrationError::DuplicateController { url: controller.url().to_owned() });
            }
            if let Some(state) = controller.state.take() {
                peer_map.insert_controller(controller.name(), state);
            }
            let routes = mem::take(&mut controller.routes);
            let instance_routes = mem::take(&mut controller.instance_routes);
            controllers.push((controller, Scope::resolve(routes, instance_routes)?));
        }

        let peer_map = Arc::new(peer_map);
        let parts = ChainParts { peers: Peers::new(&peer_map), ..parts };

        let server_assembler =
            MiddlewareAssembler::new(options.middleware.unwrap_or_default()).scoped(&server_scope.middleware);

        let mut routes = bind_scope("server", None, &server_scope, &server_assembler, &parts);
        for (controller, scope) in &controllers {
            let assembler = server_assembler.scoped(&scope.middleware);
            routes.extend(bind_scope(controller.name(), Some(controller.url()), scope, &assembler, &parts));
        }

        let fallback = Arc::new(HandlerChain::not_found(
            server_assembler.prefix().to_vec(),
            Arc::clone(&parts.on_response),
            parts.error_stage.clone(),
            parts.peers.clone(),
        ));

        Ok(Server { routes, fallback, peers: peer_map, silence, assignment: Assignment::Pending })
    }
}

struct ChainParts {
    on_response: Arc<dyn OnResponse>,
    error_stage: ErrorStage,
    peers: Peers,
}

fn bind_scope(
    owner: &str,
    prefix: Option<&str>,
    scope: &Scope,
    assembler: &MiddlewareAssembler,
    parts: &ChainParts,
) -> Vec<BoundRoute> {
    scope
        .routes
        .iter()
        .map(|route| {
            let chain = HandlerChain::route(
                route.handler_name(),
                scope.chain_of(assembler, route),
                Arc::clone(route.handler()),
                Arc::clone(&parts.on_response),
                parts.error_stage.clone(),
                parts.peers.clone(),
            );
            BoundRoute {
                method: route.method().clone(),
                path: prefix.map_or_else(|| route.path().clone(), |prefix| route.path().mount(prefix)),
                handler_name: route.handler_name().to_owned(),
                owner: owner.to_owned(),
                chain: Arc::new(chain),
            }
        })
        .collect()
}

struct BoundRoute {
    method: Method,
    path: RoutePath,
    handler_name: String,
    owner: String,
    chain: Arc<HandlerChain>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assignment {
    Pending,
    Assigned,
    Failed,
}

/// A fully resolved route table, ready to be assigned to a transport.
///
/// The server owns the shared state reachable through [`Peers`]; keep it alive for as
/// long as the transport serves requests.
pub struct Server {
    routes: Vec<BoundRoute>,
    fallback: Arc<HandlerChain>,
    peers: Arc<PeerMap>,
    silence: bool,
    assignment: Assignment,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Registers every route in table order, then the not-found fallback, and seals the
    /// transport. A server can be assigned once.
    ///
    /// If the transport rejects a registration, the routes registered before it stay on
    /// that transport. Discard it: the server refuses any further assignment with
    /// [`StartupError::PartiallyAssigned`].
    pub fn assign<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<(), StartupError> {
        match self.assignment {
            Assignment::Pending => {}
            Assignment::Assigned => return Err(StartupError::AlreadyAssigned),
            Assignment::Failed => return Err(StartupError::PartiallyAssigned),
        }

        let registered = self.register_all(transport);
        self.assignment = if registered.is_ok() { Assignment::Assigned } else { Assignment::Failed };
        registered
    }

    fn register_all<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<(), StartupError> {
        for route in &self.routes {
            let (method, path) = (&route.method, &route.path);
            if self.silence {
                debug!(%method, %path, handler = route.handler_name, owner = route.owner, "route registered");
            } else {
                info!(%method, %path, handler = route.handler_name, owner = route.owner, "route registered");
            }
            let endpoint = Arc::clone(&route.chain) as Arc<dyn Endpoint>;
            transport.register_handler(route.method.clone(), route.path.clone(), endpoint)?;
        }

        let fallback = Arc::clone(&self.fallback) as Arc<dyn Endpoint>;
        transport.register_fallback(fallback)?;
        transport.seal();
        Ok(())
    }

    pub fn is_assigned(&self) -> bool {
        self.assignment == Assignment::Assigned
    }

    /// The final table as `(method, path, handler name)`, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &RoutePath, &str)> {
        self.routes.iter().map(|route| (&route.method, &route.path, route.handler_name.as_str()))
    }

    /// A lookup handle to the server and controller state.
    pub fn peers(&self) -> Peers {
        Peers::new(&self.peers)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field(
                "routes",
                &self.routes.iter().map(|r| format!("{} {} {}", r.method, r.path, r.handler_name)).collect::<Vec<_>>(),
            )
            .field("assignment", &self.assignment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::handler::handler_fn;
    use crate::middleware::RequestLogger;
    use totea_http::route::RouteTable;

    async fn ok(_ctx: RequestContext) -> &'static str {
        "ok"
    }

    fn table(server: &Server) -> Vec<String> {
        server.routes().map(|(method, path, name)| format!("{method} {path} {name}")).collect()
    }

    #[test]
    fn test_options_merge() {
        let defaults = ServerOptions::new().middleware(RequestLogger::new()).silence(true);
        let overrides = ServerOptions::new().middleware(RequestLogger::new()).middleware(RequestLogger::new());

        let merged = ServerOptions::merge(defaults, overrides);
        assert_eq!(merged.middleware.as_ref().map(Vec::len), Some(2));
        assert_eq!(merged.silence, Some(true));
        assert!(merged.on_response.is_none());
    }

    #[test]
    fn test_server_then_controllers() {
        let child = Controller::builder("childRoute")
            .routes(Declarations::new().get("/", "index", handler_fn(ok)).get("/:id", "getChild", handler_fn(ok)))
            .build()
            .unwrap();

        let server = Server::builder()
            .routes(
                Declarations::new()
                    .get("/user/:id", "getUser", handler_fn(ok))
                    .get("/user/export", "export", handler_fn(ok)),
            )
            .controller(child)
            .build()
            .unwrap();

        assert_eq!(
            table(&server),
            vec![
                "GET /user/export export",
                "GET /user/:id getUser",
                "GET /child-route index",
                "GET /child-route/:id getChild",
            ]
        );
    }

    #[test]
    fn test_duplicate_controller() {
        let a = Controller::builder("child-route").build().unwrap();
        let b = Controller::builder("childRoute").build().unwrap();

        let error = Server::builder().controller(a).controller(b).build().unwrap_err();
        assert!(matches!(error, RegistrationError::DuplicateController { ref url } if url == "/child-route"));
    }

    #[test]
    fn test_assign_once() {
        let mut server =
            Server::builder().routes(Declarations::new().get("/", "root", handler_fn(ok))).build().unwrap();

        let mut table = RouteTable::new();
        server.assign(&mut table).unwrap();
        assert!(server.is_assigned());
        assert_eq!(table.len(), 1);

        let mut other = RouteTable::new();
        assert!(matches!(server.assign(&mut other), Err(StartupError::AlreadyAssigned)));
    }

    #[test]
    fn test_sealed_transport_is_a_startup_error() {
        let mut server =
            Server::builder().routes(Declarations::new().get("/", "root", handler_fn(ok))).build().unwrap();

        let mut table = RouteTable::new();
        table.seal();
        assert!(matches!(server.assign(&mut table), Err(StartupError::Transport(_))));
        assert!(!server.is_assigned());

        let mut fresh = RouteTable::new();
        assert!(matches!(server.assign(&mut fresh), Err(StartupError::PartiallyAssigned)));
        assert!(fresh.is_empty());
    }

    #[test]
    fn test_peers_from_server() {
        struct Config {
            name: &'static str,
        }

        let child = Controller::builder("child").state(Arc::new(Config { name: "child" })).build().unwrap();
        let server = Server::builder().state(Arc::new(Config { name: "root" })).controller(child).build().unwrap();

        let peers = server.peers();
        assert_eq!(peers.server::<Config>().unwrap().name, "root");
        assert_eq!(peers.controller::<Config>("child").unwrap().name, "child");
    }
}
