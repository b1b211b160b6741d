use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistrationError;
use crate::metadata::Declarations;
use crate::naming::{controller_name, kebab_case};
use crate::peers::SharedState;

/// A sub scope of a server, mounted under `/` + its kebab-cased name.
///
/// Routes, scope middleware, validators and overrides are declared exactly as for the
/// server; the controller's scope middleware runs after the server's.
pub struct Controller {
    name: String,
    url: String,
    pub(crate) routes: Declarations,
    pub(crate) instance_routes: Declarations,
    pub(crate) state: Option<SharedState>,
}

impl Controller {
    pub fn builder(name: impl Into<String>) -> ControllerBuilder {
        ControllerBuilder::new(name.into())
    }

    /// The camel-cased name peers use to look the controller up.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The prefix the controller's routes are mounted under.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("routes", &self.routes)
            .field("instance_routes", &self.instance_routes)
            .finish()
    }
}

pub struct ControllerBuilder {
    name: String,
    routes: Declarations,
    instance_routes: Declarations,
    state: Option<SharedState>,
}

impl ControllerBuilder {
    fn new(name: String) -> Self {
        Self { name, routes: Declarations::new(), instance_routes: Declarations::new(), state: None }
    }

    /// Class level declarations, the defaults of every instance.
    pub fn routes(mut self, routes: Declarations) -> Self {
        self.routes = routes;
        self
    }

    /// Instance level declarations; they win over [`routes`](Self::routes) on the same binding.
    pub fn instance_routes(mut self, routes: Declarations) -> Self {
        self.instance_routes = routes;
        self
    }

    /// State reachable from any request through `ctx.peers().controller::<T>(name)`.
    pub fn state<T: Any + Send + Sync>(mut self, state: Arc<T>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> Result<Controller, RegistrationError> {
        let name = controller_name(&self.name)?;
        let url = format!("/{}", kebab_case(&name));
        Ok(Controller { name, url, routes: self.routes, instance_routes: self.instance_routes, state: self.state })
    }
}
