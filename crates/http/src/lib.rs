//! The in-process transport behind the totea route registry.
//!
//! This crate is the "external HTTP server" the web layer registers its routes on. It
//! deliberately knows nothing about envelopes, middleware or validation: it only keeps an
//! ordered table of `(method, path, endpoint)` triples, picks the first matching route
//! for each request and hands the endpoint a [`Request`](protocol::Request) plus a
//! write-once [`ResponseHandle`](protocol::ResponseHandle).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use http::{Method, StatusCode};
//! use totea_http::handler::endpoint_fn;
//! use totea_http::protocol::{Request, ResponseHandle};
//! use totea_http::route::RouteTable;
//! use totea_http::transport::Transport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut table = RouteTable::new();
//! table.register_handler(
//!     Method::GET,
//!     "/hello/:name".into(),
//!     Arc::new(endpoint_fn(|request: Arc<Request>, response: ResponseHandle| async move {
//!         let name = request.params().get("name").unwrap_or("world").to_owned();
//!         let _ = response.text(StatusCode::OK, format!("hello {name}")).await;
//!     })),
//! )?;
//! table.seal();
//!
//! let request = http::Request::get("/hello/leo").body(Bytes::new())?;
//! let response = table.dispatch(request).await;
//! assert_eq!(response.body().as_ref(), b"hello leo");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: request, response handle and error types
//! - [`route`]: [`RoutePath`](route::RoutePath) templates/patterns and the [`RouteTable`](route::RouteTable)
//! - [`handler`]: the [`Endpoint`](handler::Endpoint) trait and [`endpoint_fn`](handler::endpoint_fn)
//! - [`transport`]: the [`Transport`](transport::Transport) registration trait
//!
//! # Limitations
//!
//! - bodies are fully buffered before routing
//! - no network listener; embed the table in a server of your choice

pub mod handler;
pub mod protocol;
pub mod route;
pub mod transport;
