//! Resolution of an owner's two declaration tiers into one scope.

use std::collections::HashMap;

use tracing::warn;

use crate::error::RegistrationError;
use crate::metadata::Declarations;
use crate::middleware::{MiddlewareAssembler, SharedMiddleware};
use crate::route::{RouteEntry, RouteRegistry, ensure_unique_handlers, merge, order};

/// The conflict-free, ordered routes of one owner together with their middleware.
#[derive(Default)]
pub(crate) struct Scope {
    pub(crate) routes: Vec<RouteEntry>,
    pub(crate) middleware: Vec<SharedMiddleware>,
    route_middleware: HashMap<String, Vec<SharedMiddleware>>,
    validators: HashMap<String, Vec<SharedMiddleware>>,
}

impl Scope {
    /// Checks each tier on its own, layers the instance tier over the class tier and
    /// orders the result. Middleware of both tiers is concatenated, defaults first.
    pub(crate) fn resolve(defaults: Declarations, overrides: Declarations) -> Result<Self, RegistrationError> {
        let class_routes = resolve_tier(&defaults)?;
        let instance_routes = resolve_tier(&overrides)?;
        let merged = merge(class_routes, instance_routes);
        ensure_unique_handlers(&merged)?;
        let routes = order(merged);

        let mut scope = Scope { routes, ..Scope::default() };
        for tier in [defaults, overrides] {
            scope.middleware.extend(tier.middleware);
            for (name, middleware) in tier.route_middleware {
                scope.route_middleware.entry(name).or_default().push(middleware);
            }
            for (name, validator) in tier.validators {
                scope.validators.entry(name).or_default().push(validator);
            }
        }

        for (kind, names) in [("middleware", scope.route_middleware.keys()), ("validator", scope.validators.keys())] {
            for name in names {
                if !scope.routes.iter().any(|route| route.handler_name() == name) {
                    warn!(handler = name, kind, "declared for a handler without routes, it will never run");
                }
            }
        }

        Ok(scope)
    }

    /// Builds the chain of `route`: the assembler's prefix, then validators, then route middleware.
    pub(crate) fn chain_of(&self, assembler: &MiddlewareAssembler, route: &RouteEntry) -> Vec<SharedMiddleware> {
        let validators = self.validators.get(route.handler_name()).map(Vec::as_slice).unwrap_or_default();
        let middleware = self.route_middleware.get(route.handler_name()).map(Vec::as_slice).unwrap_or_default();
        assembler.assemble(validators, middleware)
    }
}

fn resolve_tier(declarations: &Declarations) -> Result<Vec<RouteEntry>, RegistrationError> {
    let mut registry = RouteRegistry::new();
    for name in &declarations.overrides {
        registry.mark_override(name.clone());
    }
    for entry in &declarations.routes {
        registry.register(entry.clone())?;
    }
    registry.resolve()
}
