//! A declarative route registry and dispatch pipeline.
//!
//! Routes are declared on a [`Server`] or a [`Controller`] through [`Declarations`],
//! in two tiers: class defaults and instance overrides. Building the owner resolves
//! conflicts, orders the routes so literal paths win over parameterized ones, and
//! assembles one middleware chain per route. [`Server::assign`] then hands the chains
//! to any [`Transport`](totea_http::transport::Transport).
//!
//! Every request ends in exactly one JSON envelope:
//!
//! ```json
//! {"status": 200, "message": "OK", "result": {"id": 1, "name": "leo"}}
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use serde_json::json;
//! use totea_http::route::RouteTable;
//! use totea_web::metadata::Declarations;
//! use totea_web::validator::Validator;
//! use totea_web::{RequestContext, Server, handler_fn};
//!
//! async fn add_user(ctx: RequestContext) -> serde_json::Value {
//!     json!({"id": 1, "name": ctx.body()["name"]})
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut server = Server::builder()
//!     .routes(
//!         Declarations::new()
//!             .post("/user", "addUser", handler_fn(add_user))
//!             .validate("addUser", Validator::body(|body| body.get("name").is_some())),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut table = RouteTable::new();
//! server.assign(&mut table).unwrap();
//!
//! let request = http::Request::post("/user")
//!     .header("content-type", "application/json")
//!     .body(Bytes::from_static(br#"{"name":"leo"}"#))
//!     .unwrap();
//! let response = table.dispatch(request).await;
//! let envelope: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
//! assert_eq!(envelope, json!({"status": 200, "message": "OK", "result": {"id": 1, "name": "leo"}}));
//! # });
//! ```

mod context;
mod controller;
mod error;
mod handler;
mod naming;
mod peers;
mod responder;
mod scope;
mod server;

pub mod dispatcher;
pub mod envelope;
pub mod metadata;
pub mod middleware;
pub mod route;
pub mod validator;

pub use context::RequestContext;
pub use controller::{Controller, ControllerBuilder};
pub use envelope::{Envelope, JsonEnvelope, OnResponse};
pub use error::{HandlerError, HttpError, RegistrationError, StartupError};
pub use handler::{FnHandler, RouteHandler, handler_fn};
pub use metadata::Declarations;
pub use middleware::{ErrorMiddleware, Middleware, error_middleware_fn, middleware_fn};
pub use peers::Peers;
pub use responder::{Json, Reply, Responder};
pub use server::{Server, ServerBuilder, ServerOptions};
pub use validator::{Target, Validator, Verdict};
