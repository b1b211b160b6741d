//! The per-request context handed to middleware and handlers.
//!
//! A [`RequestContext`] bundles the routed request, its response handle, the parsed
//! query string and body, and the [`Peers`] lookup. It is cheap to clone: every clone
//! refers to the same request and the same response slot.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use totea_http::protocol::{PathParams, Request, ResponseHandle};
use tracing::debug;

use crate::error::HttpError;
use crate::peers::Peers;

#[derive(Clone, Debug)]
pub struct RequestContext {
    inner: Arc<Inner>,
    response: ResponseHandle,
    peers: Peers,
}

#[derive(Debug)]
struct Inner {
    request: Arc<Request>,
    query: Value,
    body: Value,
    body_error: Option<HttpError>,
}

impl RequestContext {
    /// Builds the context, parsing the query string and the body up front.
    ///
    /// A body that claims to be JSON but is not parseable does not fail construction;
    /// the pipeline reports it as a `400` before any middleware runs.
    pub fn new(request: Arc<Request>, response: ResponseHandle, peers: Peers) -> Self {
        let query = parse_query(request.query());
        let (body, body_error) = match parse_body(&request) {
            Ok(body) => (body, None),
            Err(error) => (Value::Object(Map::new()), Some(error)),
        };

        Self { inner: Arc::new(Inner { request, query, body, body_error }), response, peers }
    }

    /// Builds a detached context from a plain `http::Request`, mainly for exercising
    /// handlers without a server.
    pub fn from_http(request: http::Request<Bytes>, params: PathParams) -> Self {
        Self::new(Arc::new(Request::from_http(request, params)), ResponseHandle::new(), Peers::detached())
    }

    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    pub fn method(&self) -> &Method {
        self.inner.request.method()
    }

    pub fn path(&self) -> &str {
        self.inner.request.path()
    }

    /// The query string as a JSON object; nested `a[b]=c` keys become nested objects.
    pub fn query(&self) -> &Value {
        &self.inner.query
    }

    /// The parsed body; `{}` when the request carried no JSON or form body.
    pub fn body(&self) -> &Value {
        &self.inner.body
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.request.headers()
    }

    pub fn path_params(&self) -> &PathParams {
        self.inner.request.params()
    }

    /// Shortcut for `path_params().get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params().get(name)
    }

    pub fn peers(&self) -> &Peers {
        &self.peers
    }

    /// Deserializes the body into `T`, answering `400` with the serde message on failure.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        T::deserialize(self.body()).map_err(|e| HttpError::bad_request(e.to_string()))
    }

    /// Deserializes the query into `T`, answering `400` with the serde message on failure.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        T::deserialize(self.query()).map_err(|e| HttpError::bad_request(e.to_string()))
    }

    /// Path parameters as a JSON object of strings.
    pub fn path_params_value(&self) -> Value {
        let map = self.path_params().iter().map(|(k, v)| (k.to_owned(), Value::String(v.to_owned()))).collect();
        Value::Object(map)
    }

    /// Headers as a JSON object keyed by lower-case name; repeated headers are joined with `, `.
    pub fn headers_value(&self) -> Value {
        let mut map = Map::new();
        for name in self.headers().keys() {
            let joined = self
                .headers()
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            map.insert(name.as_str().to_owned(), Value::String(joined));
        }
        Value::Object(map)
    }

    pub(crate) fn body_error(&self) -> Option<&HttpError> {
        self.inner.body_error.as_ref()
    }
}

fn parse_query(raw: Option<&str>) -> Value {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        return Value::Object(Map::new());
    };

    match serde_qs::from_str::<Map<String, Value>>(raw) {
        Ok(map) => Value::Object(map),
        Err(e) => {
            debug!(cause = %e, query = raw, "nested query parsing failed, falling back to flat pairs");
            parse_pairs(raw)
        }
    }
}

/// `a=1&a=2&b=3` becomes `{"a": ["1", "2"], "b": "3"}`.
fn parse_pairs(raw: &str) -> Value {
    let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(raw).unwrap_or_default();

    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            None => {
                map.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    Value::Object(map)
}

fn parse_body(request: &Request) -> Result<Value, HttpError> {
    let body = request.body();
    if body.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let Some(content_type) = request.content_type() else {
        return Ok(Value::Object(Map::new()));
    };

    let is_json = content_type.essence_str() == mime::APPLICATION_JSON.essence_str()
        || content_type.suffix().is_some_and(|suffix| suffix == mime::JSON);
    if is_json {
        return serde_json::from_slice(body).map_err(|e| HttpError::bad_request(format!("invalid json body: {e}")));
    }

    if content_type.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        let raw = std::str::from_utf8(body).map_err(|_| HttpError::bad_request("form body is not utf8"))?;
        return Ok(parse_pairs(raw));
    }

    Ok(Value::Object(Map::new()))
}
