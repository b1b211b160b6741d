//! Request, response and error types shared by the transport and its endpoints.
//!
//! - [`Request`]: a routed request with its buffered body and [`PathParams`]
//! - [`ResponseHandle`]: the write-once response slot of one request
//! - [`TransportError`] / [`SendError`]: registration and response errors

mod request;
pub use request::PathParams;
pub use request::Request;

mod response;
pub use response::ResponseHandle;

mod error;
pub use error::SendError;
pub use error::TransportError;
