//! Matched request handling.
//!
//! A [`Request`] is what an [`Endpoint`](crate::handler::Endpoint) receives once the
//! route table picked a route for it: the request head, the fully buffered body and the
//! path parameters captured by the matching [`RoutePath`](crate::route::RoutePath).

use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri, Version};
use mime::Mime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A request routed to one endpoint.
///
/// The body is buffered by the transport before routing, so endpoints can read it
/// as many times as they like.
#[derive(Debug)]
pub struct Request {
    head: Parts,
    body: Bytes,
    params: PathParams,
}

impl Request {
    /// Creates a request from its head, body and the captured path parameters.
    pub fn new(head: Parts, body: Bytes, params: PathParams) -> Self {
        Self { head, body, params }
    }

    /// Splits an `http::Request` and attaches the given path parameters.
    pub fn from_http(request: http::Request<Bytes>, params: PathParams) -> Self {
        let (head, body) = request.into_parts();
        Self::new(head, body, params)
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the path component of the URI.
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Returns the raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.head.uri.query()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.head.version
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns the request extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.head.extensions
    }

    /// Returns the buffered request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the path parameters captured while routing.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Parses the `Content-Type` header, ignoring values that are not valid mime types.
    pub fn content_type(&self) -> Option<Mime> {
        self.headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Mime>().ok())
    }
}

/// Path parameters captured from a request path, in capture order.
///
/// For `/user/:id` matched against `/user/42`, `get("id")` returns `Some("42")`.
/// Unnamed regular expression groups are keyed by their position (`"0"`, `"1"`, ...),
/// a trailing `*` wildcard is keyed `"*"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty parameter set.
    #[inline]
    pub fn empty() -> Self {
        Self { inner: Vec::new() }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns true if there are no path parameters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of path parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.inner.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Iterates over `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = PathParams::empty();
        for (key, value) in iter {
            params.push(key, value);
        }
        params
    }
}

impl Serialize for PathParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.inner.len()))?;
        for (key, value) in &self.inner {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
