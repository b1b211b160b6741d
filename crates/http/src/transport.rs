use std::sync::Arc;

use http::Method;

use crate::handler::Endpoint;
use crate::protocol::TransportError;
use crate::route::RoutePath;

/// The registration surface a route registry needs from an HTTP server.
///
/// Routes are tried in the order they were registered; the fallback endpoint answers
/// every request no route matched. Once [`seal`](Transport::seal)ed, the table must
/// reject further registrations.
pub trait Transport {
    fn register_handler(
        &mut self,
        method: Method,
        path: RoutePath,
        endpoint: Arc<dyn Endpoint>,
    ) -> Result<(), TransportError>;

    fn register_fallback(&mut self, endpoint: Arc<dyn Endpoint>) -> Result<(), TransportError>;

    fn seal(&mut self) {}
}
