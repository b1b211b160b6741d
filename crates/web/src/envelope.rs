//! The uniform response envelope and the hook that writes it.
//!
//! Every answer produced by the pipeline, success or error, has the wire shape
//! `{"status": <int>, "message": <string>, "result": <any, optional>}`.

use async_trait::async_trait;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use totea_http::protocol::{ResponseHandle, SendError};

use crate::error::{HttpError, reason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    status: u16,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
}

impl Envelope {
    /// An envelope of `status` whose message is the reason phrase.
    pub fn new(status: StatusCode) -> Self {
        Self { status: status.as_u16(), message: reason(status).to_owned(), result: None }
    }

    /// `{status: 200, message: "OK", result}`.
    pub fn ok(result: Value) -> Self {
        Self::new(StatusCode::OK).with_result(result)
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attaches a result; `null` is treated as no result.
    #[must_use]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = (!result.is_null()).then_some(result);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// True when `object` is spread into the envelope instead of being wrapped: it
    /// carries a non-empty string `message`, or an integer `status`/`code`.
    pub(crate) fn is_spreadable(object: &Map<String, Value>) -> bool {
        let has_message = object.get("message").and_then(Value::as_str).is_some_and(|m| !m.is_empty());
        has_message || status_field(object).is_some()
    }

    /// Builds an envelope from a caller-controlled object, filling in defaults:
    /// status `200`, message the status' reason phrase.
    pub(crate) fn spread(mut object: Map<String, Value>) -> Self {
        let status = status_field(&object).unwrap_or(200);
        let message = match object.remove("message") {
            Some(Value::String(message)) if !message.is_empty() => message,
            _ => code_reason(status).to_owned(),
        };
        let result = object.remove("result").filter(|result| !result.is_null());
        Self { status, message, result }
    }
}

fn status_field(object: &Map<String, Value>) -> Option<u16> {
    ["status", "code"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| value.as_u64().and_then(|code| u16::try_from(code).ok()))
}

fn code_reason(code: u16) -> &'static str {
    StatusCode::from_u16(code).map_or("Unknown", reason)
}

impl From<&HttpError> for Envelope {
    fn from(error: &HttpError) -> Self {
        Envelope::new(error.status()).with_message(error.message())
    }
}

impl From<HttpError> for Envelope {
    fn from(error: HttpError) -> Self {
        Envelope::from(&error)
    }
}

/// Serializes an envelope onto the response. One instance is shared by every route of
/// a server, including its error stage.
#[async_trait]
pub trait OnResponse: Send + Sync {
    async fn on_response(&self, envelope: Envelope, response: &ResponseHandle) -> Result<(), SendError>;
}

/// Writes the envelope as `application/json`.
///
/// By default the HTTP status line is always `200` and the outcome lives in the
/// envelope's `status` field; [`mirror_status`](JsonEnvelope::mirror_status) copies the
/// envelope status onto the status line instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEnvelope {
    mirror_status: bool,
}

impl JsonEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mirror_status(mut self, mirror_status: bool) -> Self {
        self.mirror_status = mirror_status;
        self
    }
}

#[async_trait]
impl OnResponse for JsonEnvelope {
    async fn on_response(&self, envelope: Envelope, response: &ResponseHandle) -> Result<(), SendError> {
        let status = if self.mirror_status {
            StatusCode::from_u16(envelope.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            StatusCode::OK
        };
        response.json(status, &envelope).await
    }
}
