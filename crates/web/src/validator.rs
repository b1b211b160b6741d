//! Declarative request validation.
//!
//! A [`Validator`] picks one part of the request as JSON, runs a check against it and
//! turns the [`Verdict`] into either a pass or an [`HttpError`]. Validators are attached
//! to a route with `Declarations::validate` and run right before the route's own
//! middleware.
//!
//! ```
//! use totea_web::validator::Validator;
//!
//! let has_name = Validator::body(|body| body.get("name").and_then(|name| name.as_str()).is_some())
//!     .message("body.name is required");
//! ```

use std::borrow::Cow;
use std::fmt::{self, Display};
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::{HandlerError, HttpError, reason};
use crate::middleware::Middleware;

/// The part of the request a validator inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Body,
    Query,
    PathParams,
    Headers,
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Target::Body => "body",
            Target::Query => "query",
            Target::PathParams => "path params",
            Target::Headers => "headers",
        };
        f.write_str(name)
    }
}

/// The outcome of a check.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    /// Fails with `400`.
    Reject,
    /// Fails with the given status.
    Status(StatusCode),
    /// Fails with `400` and the given message.
    Message(String),
    /// Fails with the given error as is.
    Error(HttpError),
}

impl From<bool> for Verdict {
    fn from(valid: bool) -> Self {
        if valid { Verdict::Pass } else { Verdict::Reject }
    }
}

impl From<()> for Verdict {
    fn from(_: ()) -> Self {
        Verdict::Pass
    }
}

impl From<StatusCode> for Verdict {
    fn from(status: StatusCode) -> Self {
        Verdict::Status(status)
    }
}

impl From<u16> for Verdict {
    fn from(code: u16) -> Self {
        Verdict::Status(StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
    }
}

impl From<String> for Verdict {
    fn from(message: String) -> Self {
        Verdict::Message(message)
    }
}

impl From<&str> for Verdict {
    fn from(message: &str) -> Self {
        Verdict::Message(message.to_owned())
    }
}

impl From<HttpError> for Verdict {
    fn from(error: HttpError) -> Self {
        Verdict::Error(error)
    }
}

impl<E: Display> From<Result<(), E>> for Verdict {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Verdict::Pass,
            Err(e) => Verdict::Message(e.to_string()),
        }
    }
}

type Check = dyn Fn(&Value) -> Verdict + Send + Sync;

/// A check bound to a request target, usable as a [`Middleware`].
#[derive(Clone)]
pub struct Validator {
    target: Target,
    check: Arc<Check>,
    error_message: Option<String>,
}

impl Validator {
    pub fn new<F, V>(target: Target, check: F) -> Self
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        let check: Arc<Check> = Arc::new(move |value: &Value| -> Verdict { check(value).into() });
        Self { target, check, error_message: None }
    }

    pub fn body<F, V>(check: F) -> Self
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self::new(Target::Body, check)
    }

    pub fn query<F, V>(check: F) -> Self
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self::new(Target::Query, check)
    }

    pub fn path_params<F, V>(check: F) -> Self
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self::new(Target::PathParams, check)
    }

    pub fn headers<F, V>(check: F) -> Self
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self::new(Target::Headers, check)
    }

    /// Validates the target by deserializing it into `T`. The failure message is the
    /// serde error, which names the offending or missing field.
    pub fn schema<T: DeserializeOwned + 'static>(target: Target) -> Self {
        Self::new(target, |value: &Value| T::deserialize(value).map(drop))
    }

    /// Replaces the reason phrase of failures that carry no message of their own.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Runs the check against `value`.
    pub fn check(&self, value: &Value) -> Result<(), HttpError> {
        let failed = |status: StatusCode| {
            let message = self.error_message.as_deref().unwrap_or_else(|| reason(status));
            Err(HttpError::with_message(status, message))
        };

        match (self.check)(value) {
            Verdict::Pass => Ok(()),
            Verdict::Reject => failed(StatusCode::BAD_REQUEST),
            Verdict::Status(status) => failed(status),
            Verdict::Message(message) => Err(HttpError::bad_request(message)),
            Verdict::Error(error) => Err(error),
        }
    }

    fn extract<'a>(&self, ctx: &'a RequestContext) -> Cow<'a, Value> {
        match self.target {
            Target::Body => Cow::Borrowed(ctx.body()),
            Target::Query => Cow::Borrowed(ctx.query()),
            Target::PathParams => Cow::Owned(ctx.path_params_value()),
            Target::Headers => Cow::Owned(ctx.headers_value()),
        }
    }
}

#[async_trait]
impl Middleware for Validator {
    async fn handle(&self, ctx: &RequestContext) -> Result<(), HandlerError> {
        let value = self.extract(ctx);
        self.check(&value).map_err(HandlerError::Http)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("target", &self.target).field("error_message", &self.error_message).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::Deserialize;
    use serde_json::json;
    use totea_http::protocol::PathParams;

    #[test]
    fn test_verdicts() {
        let value = json!({});

        let rejected = Validator::body(|_: &Value| false).check(&value).unwrap_err();
        assert_eq!(rejected, HttpError::with_message(StatusCode::BAD_REQUEST, "Bad Request"));

        let status = Validator::body(|_: &Value| 401u16).check(&value).unwrap_err();
        assert_eq!(status, HttpError::with_message(StatusCode::UNAUTHORIZED, "Unauthorized"));

        let message = Validator::body(|_: &Value| "name is required").check(&value).unwrap_err();
        assert_eq!(message, HttpError::bad_request("name is required"));

        let error = Validator::body(|_: &Value| HttpError::with_message(StatusCode::CONFLICT, "taken"))
            .check(&value)
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::CONFLICT);

        assert!(Validator::body(|_: &Value| true).check(&value).is_ok());
        assert!(Validator::body(|_: &Value| Ok::<(), String>(())).check(&value).is_ok());
    }

    #[test]
    fn test_error_message_only_replaces_reason_phrase() {
        let value = json!({});

        let rejected = Validator::body(|_: &Value| false).message("invalid user").check(&value).unwrap_err();
        assert_eq!(rejected, HttpError::bad_request("invalid user"));

        let status = Validator::body(|_: &Value| StatusCode::FORBIDDEN).message("no access").check(&value).unwrap_err();
        assert_eq!(status, HttpError::with_message(StatusCode::FORBIDDEN, "no access"));

        let own = Validator::body(|_: &Value| "own message").message("ignored").check(&value).unwrap_err();
        assert_eq!(own.message(), "own message");
    }

    #[test]
    fn test_schema() {
        #[derive(Deserialize)]
        #[allow(dead_code, reason = "only validated, never read")]
        struct NewUser {
            name: String,
        }

        let validator = Validator::schema::<NewUser>(Target::Body);
        assert!(validator.check(&json!({"name": "leo"})).is_ok());

        let error = validator.check(&json!({})).unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert!(error.message().contains("missing field `name`"));
    }

    #[tokio::test]
    async fn test_targets() {
        let request = http::Request::get("/user/7?page=2").header("token", "abc").body(Bytes::new()).unwrap();
        let ctx = RequestContext::from_http(request, [("id", "7")].into_iter().collect::<PathParams>());

        let id = Validator::path_params(|params: &Value| params["id"] == "7");
        let page = Validator::query(|query: &Value| query["page"] == "2");
        let token = Validator::headers(|headers: &Value| headers.get("token").is_some());
        let body = Validator::body(|body: &Value| body.get("name").is_some());

        assert!(id.handle(&ctx).await.is_ok());
        assert!(page.handle(&ctx).await.is_ok());
        assert!(token.handle(&ctx).await.is_ok());
        assert_eq!(body.handle(&ctx).await.unwrap_err().into_http().status(), StatusCode::BAD_REQUEST);
        assert_eq!(body.target().to_string(), "body");
    }
}
