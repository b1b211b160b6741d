//! Non-owning lookup of server and controller state.
//!
//! The server owns one [`PeerMap`]; every request context gets a [`Peers`] handle holding
//! only a weak reference to it. Controllers can therefore reach the server's state or a
//! sibling controller by name without sharing ownership of either.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::naming::camelize;

pub(crate) type SharedState = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub(crate) struct PeerMap {
    server: Option<SharedState>,
    controllers: HashMap<String, SharedState>,
}

impl PeerMap {
    pub(crate) fn new(server: Option<SharedState>) -> Self {
        Self { server, controllers: HashMap::new() }
    }

    pub(crate) fn insert_controller(&mut self, name: &str, state: SharedState) {
        self.controllers.insert(name.to_owned(), state);
    }
}

/// A weak handle to the server-owned state map.
#[derive(Clone, Default)]
pub struct Peers {
    map: Weak<PeerMap>,
}

impl Peers {
    pub(crate) fn new(map: &Arc<PeerMap>) -> Self {
        Self { map: Arc::downgrade(map) }
    }

    /// A handle that resolves nothing, for contexts built outside a server.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Returns the server state registered with `ServerBuilder::state`, if it is a `T`.
    pub fn server<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let map = self.map.upgrade()?;
        let state = Arc::clone(map.server.as_ref()?);
        state.downcast::<T>().ok()
    }

    /// Returns the state of the controller called `name`, if it is a `T`.
    ///
    /// Names are compared in their camel-case form, so `"child-route"` finds `childRoute`.
    pub fn controller<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let map = self.map.upgrade()?;
        let state = Arc::clone(map.controllers.get(&camelize(name))?);
        state.downcast::<T>().ok()
    }

    /// Names of all controllers that registered state.
    pub fn controller_names(&self) -> Vec<String> {
        let mut names =
            self.map.upgrade().map(|map| map.controllers.keys().cloned().collect::<Vec<_>>()).unwrap_or_default();
        names.sort();
        names
    }
}

impl fmt::Debug for Peers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peers").field("attached", &(self.map.strong_count() > 0)).finish()
    }
}
