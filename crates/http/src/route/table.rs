use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Response, StatusCode};
use tracing::{debug, warn};

use crate::handler::Endpoint;
use crate::protocol::{PathParams, Request, ResponseHandle, TransportError};
use crate::route::RoutePath;
use crate::transport::Transport;

/// An in-process [`Transport`] that matches routes in registration order.
///
/// The first route whose method and path match wins, so the registering side is
/// responsible for putting specific routes ahead of catch-alls. `HEAD` requests fall
/// back to `GET` routes.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<RouteSlot>,
    fallback: Option<Arc<dyn Endpoint>>,
    sealed: bool,
}

struct RouteSlot {
    method: Method,
    path: RoutePath,
    endpoint: Arc<dyn Endpoint>,
}

/// A successful lookup: the endpoint to call and the captured path parameters.
pub struct RouteMatch<'table> {
    endpoint: &'table Arc<dyn Endpoint>,
    params: PathParams,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over registered routes in matching order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &RoutePath)> {
        self.routes.iter().map(|slot| (&slot.method, &slot.path))
    }

    /// Finds the first route matching `method` and `path`.
    pub fn at(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|slot| slot.method == method || (method == Method::HEAD && slot.method == Method::GET))
            .find_map(|slot| slot.path.matches(path).map(|params| RouteMatch { endpoint: &slot.endpoint, params }))
    }

    /// Routes one request and returns the response its endpoint wrote.
    pub async fn dispatch(&self, request: http::Request<Bytes>) -> Response<Bytes> {
        let (head, body) = request.into_parts();

        let (endpoint, params) = match self.at(&head.method, head.uri.path()) {
            Some(matched) => (Arc::clone(matched.endpoint), matched.params),
            None => match &self.fallback {
                Some(fallback) => (Arc::clone(fallback), PathParams::empty()),
                None => {
                    debug!(method = %head.method, path = head.uri.path(), "no route matched and no fallback registered");
                    return empty_response(StatusCode::NOT_FOUND);
                }
            },
        };

        let request = Arc::new(Request::new(head, body, params));
        let response = ResponseHandle::new();
        endpoint.call(Arc::clone(&request), response.clone()).await;

        match response.take().await {
            Some(response) => response,
            None => {
                warn!(method = %request.method(), path = request.path(), "endpoint finished without sending a response");
                empty_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl RouteMatch<'_> {
    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        self.endpoint
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }
}

fn empty_response(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

impl Transport for RouteTable {
    fn register_handler(
        &mut self,
        method: Method,
        path: RoutePath,
        endpoint: Arc<dyn Endpoint>,
    ) -> Result<(), TransportError> {
        if self.sealed {
            return Err(TransportError::sealed(format!("{method} {path}")));
        }
        debug!(%method, %path, position = self.routes.len(), "route added to table");
        self.routes.push(RouteSlot { method, path, endpoint });
        Ok(())
    }

    fn register_fallback(&mut self, endpoint: Arc<dyn Endpoint>) -> Result<(), TransportError> {
        if self.sealed {
            return Err(TransportError::sealed("fallback"));
        }
        if self.fallback.is_some() {
            return Err(TransportError::FallbackAlreadySet);
        }
        self.fallback = Some(endpoint);
        Ok(())
    }

    fn seal(&mut self) {
        self.sealed = true;
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes().map(|(method, path)| format!("{method} {path}")).collect::<Vec<_>>())
            .field("has_fallback", &self.fallback.is_some())
            .field("sealed", &self.sealed)
            .finish()
    }
}
