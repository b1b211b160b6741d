//! Conversion of handler return values into a [`Reply`].
//!
//! The [`Responder`] trait defines what a handler may return. The resulting [`Reply`]
//! is what the dispatcher normalizes into the response envelope:
//!
//! | returned value                       | reply                         |
//! |--------------------------------------|-------------------------------|
//! | `()`, `None`                         | `Reply::Empty` (becomes 500)  |
//! | `HttpError`                          | `Reply::Error` (forwarded)    |
//! | `Err(e)` of a `Result`               | thrown: `HandlerError`        |
//! | `Envelope`                           | `Reply::Envelope`             |
//! | strings, numbers, `Value`, `Json<T>` | `Reply::Value`                |

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{HandlerError, HttpError};

/// The outcome of a handler, before envelope normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing was returned.
    Empty,
    /// A plain value; objects with `message`/`status`/`code` fields are spread into the envelope.
    Value(Value),
    /// A caller-built envelope.
    Envelope(Envelope),
    /// An error returned (not thrown) by the handler.
    Error(HttpError),
}

/// A trait for types that a route handler can return.
pub trait Responder {
    fn into_reply(self) -> Result<Reply, HandlerError>;
}

/// Serializes `T` with serde and replies with the resulting JSON value.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl Responder for Reply {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(self)
    }
}

/// `Err` is treated as thrown and goes to the error stage untouched.
impl<T, E> Responder for Result<T, E>
where
    T: Responder,
    E: Into<HandlerError>,
{
    fn into_reply(self) -> Result<Reply, HandlerError> {
        match self {
            Ok(t) => t.into_reply(),
            Err(e) => Err(e.into()),
        }
    }
}

impl<T: Responder> Responder for Option<T> {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        match self {
            Some(t) => t.into_reply(),
            None => Ok(Reply::Empty),
        }
    }
}

impl Responder for () {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(Reply::Empty)
    }
}

impl Responder for HttpError {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(Reply::Error(self))
    }
}

impl Responder for Envelope {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(Reply::Envelope(self))
    }
}

/// A bare status code replies with an envelope of that status and its reason phrase.
impl Responder for StatusCode {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(Reply::Envelope(Envelope::new(self)))
    }
}

impl Responder for Value {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(Reply::Value(self))
    }
}

impl<T: Serialize> Responder for Json<T> {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(Reply::Value(serde_json::to_value(self.0)?))
    }
}

impl<T: Responder> Responder for Box<T> {
    fn into_reply(self) -> Result<Reply, HandlerError> {
        (*self).into_reply()
    }
}

macro_rules! impl_responder_for_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Responder for $ty {
                fn into_reply(self) -> Result<Reply, HandlerError> {
                    Ok(Reply::Value(Value::from(self)))
                }
            }
        )*
    };
}

impl_responder_for_value!(String, &'static str, bool, i32, i64, u32, u64, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;

    #[test]
    fn test_plain_values() {
        assert_eq!("ok".into_reply().unwrap(), Reply::Value(json!("ok")));
        assert_eq!(1.into_reply().unwrap(), Reply::Value(json!(1)));
        assert_eq!(String::from("a").into_reply().unwrap(), Reply::Value(json!("a")));
    }

    #[test]
    fn test_nothing_is_empty() {
        assert_eq!(().into_reply().unwrap(), Reply::Empty);
        assert_eq!(None::<String>.into_reply().unwrap(), Reply::Empty);
    }

    #[test]
    fn test_returned_error_is_not_thrown() {
        let reply = HttpError::new(StatusCode::UNAUTHORIZED).into_reply().unwrap();
        assert_eq!(reply, Reply::Error(HttpError::new(StatusCode::UNAUTHORIZED)));
    }

    #[test]
    fn test_err_is_thrown() {
        let result: Result<&'static str, io::Error> = Err(io::Error::other("boom"));
        assert!(result.into_reply().unwrap_err().is_unexpected());

        let result: Result<&'static str, HttpError> = Err(HttpError::bad_request("bad"));
        let error = result.into_reply().unwrap_err().into_http();
        assert_eq!(error.message(), "bad");
    }

    #[test]
    fn test_json_wrapper() {
        #[derive(Serialize)]
        struct User {
            id: u32,
            name: &'static str,
        }

        let reply = Json(User { id: 1, name: "leo" }).into_reply().unwrap();
        assert_eq!(reply, Reply::Value(json!({"id": 1, "name": "leo"})));
    }
}
