//! Error types of the route registry and the request pipeline.
//!
//! - [`RegistrationError`]: conflicting declarations, raised by `build()` before anything
//!   reaches a transport
//! - [`StartupError`]: anything that stops [`Server::assign`](crate::Server::assign)
//! - [`HttpError`]: a status-coded error that ends up in the response envelope verbatim
//! - [`HandlerError`]: what handlers and middleware return; wraps either an
//!   [`HttpError`] or an unexpected error that will be masked as a `500`

use std::error::Error as StdError;
use std::fmt;

use http::{Method, StatusCode};
use thiserror::Error;
use totea_http::protocol::TransportError;
use totea_http::route::RoutePath;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("handler `{handler}` is bound to {method} {path}, can not bind it again to {new_method} {new_path}")]
    DuplicateHandler { handler: String, method: Method, path: RoutePath, new_method: Method, new_path: RoutePath },

    #[error("{method} {path} is already bound to `{existing}`, mark `{handler}` as override to replace it")]
    DuplicateRoute { method: Method, path: RoutePath, existing: String, handler: String },

    #[error("controller which url is {url} is already used")]
    DuplicateController { url: String },

    #[error("invalid controller name `{name}`: {reason}")]
    InvalidControllerName { name: String, reason: &'static str },
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("transport rejected the route table: {0}")]
    Transport(#[from] TransportError),

    #[error("server routes are already assigned")]
    AlreadyAssigned,

    #[error("a previous assignment failed partway, the transport holds a partial route table")]
    PartiallyAssigned,
}

/// An error carrying the status code and message of the envelope it becomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    /// Creates an error whose message is the status' reason phrase.
    pub fn new(status: StatusCode) -> Self {
        Self { status, message: reason(status).to_owned() }
    }

    pub fn with_message(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// Creates an error from a raw status code; codes outside `100..=999` become `500`.
    pub fn from_code(code: u16) -> Self {
        StatusCode::from_u16(code).map_or_else(|_| Self::internal(), Self::new)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StatusCode> for HttpError {
    fn from(status: StatusCode) -> Self {
        HttpError::new(status)
    }
}

/// Returns the canonical reason phrase of `status`, or `"Unknown"`.
pub(crate) fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// The error type of handlers and middleware.
///
/// Anything implementing [`std::error::Error`] converts into it with `?`. An
/// [`HttpError`] (even boxed inside another conversion) keeps its status and message;
/// every other error is `Unexpected` and will be answered with a generic `500`.
pub enum HandlerError {
    Http(HttpError),
    Unexpected(Box<dyn StdError + Send + Sync>),
}

impl HandlerError {
    pub fn unexpected<E: Into<Box<dyn StdError + Send + Sync>>>(error: E) -> Self {
        Self::Unexpected(error.into())
    }

    /// Collapses the error into the [`HttpError`] that is shown to the caller.
    pub fn into_http(self) -> HttpError {
        match self {
            HandlerError::Http(error) => error,
            HandlerError::Unexpected(_) => HttpError::internal(),
        }
    }

    /// The [`HttpError`] this error would be answered with, without consuming it.
    pub fn to_http(&self) -> HttpError {
        match self {
            HandlerError::Http(error) => error.clone(),
            HandlerError::Unexpected(_) => HttpError::internal(),
        }
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, HandlerError::Unexpected(_))
    }
}

impl<E> From<E> for HandlerError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = Box::new(error);
        match boxed.downcast::<HttpError>() {
            Ok(http) => HandlerError::Http(*http),
            Err(other) => HandlerError::Unexpected(other),
        }
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Http(error) => f.debug_tuple("Http").field(error).finish(),
            HandlerError::Unexpected(error) => f.debug_tuple("Unexpected").field(error).finish(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Http(error) => fmt::Display::fmt(error, f),
            HandlerError::Unexpected(error) => write!(f, "unexpected error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_http_error_defaults_to_reason_phrase() {
        let error = HttpError::new(StatusCode::NOT_FOUND);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.message(), "Not Found");
        assert_eq!(error.to_string(), "404 Not Found: Not Found");
    }

    #[test]
    fn test_from_code() {
        assert_eq!(HttpError::from_code(410).status(), StatusCode::GONE);
        assert_eq!(HttpError::from_code(42).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_http_error_survives_conversion() {
        let error: HandlerError = HttpError::with_message(StatusCode::NOT_ACCEPTABLE, "nope").into();
        let http = error.into_http();
        assert_eq!(http.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(http.message(), "nope");
    }

    #[test]
    fn test_foreign_error_is_masked() {
        let error: HandlerError = io::Error::other("database password is hunter2").into();
        assert!(error.is_unexpected());

        let http = error.into_http();
        assert_eq!(http.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http.message(), "Internal Server Error");
    }

    #[test]
    fn test_question_mark_converts() {
        fn parse(input: &str) -> Result<i32, HandlerError> {
            Ok(input.parse::<i32>()?)
        }
        assert!(parse("x").unwrap_err().is_unexpected());
    }
}
