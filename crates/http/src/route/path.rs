//! Route paths: literal templates and regular expression patterns.
//!
//! A literal template is a `/`-separated path where a segment may be a named parameter
//! (`:id`) and the last segment may be a `*` wildcard. Everything else must match
//! verbatim. A pattern wraps a [`Regex`] and captures its groups as path parameters.
//!
//! Captured parameters are percent-decoded. A capture that does not decode to UTF-8
//! fails the match.
//!
//! ```
//! use totea_http::route::RoutePath;
//!
//! let path = RoutePath::from("/user/:id");
//! let params = path.matches("/user/42").unwrap();
//! assert_eq!(params.get("id"), Some("42"));
//! assert!(path.matches("/user/42/export").is_none());
//! ```

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;

use crate::protocol::PathParams;

const WILDCARD_PARAM: &str = "*";

/// A route path as registered on the transport.
#[derive(Debug, Clone)]
pub struct RoutePath {
    kind: PathKind,
}

#[derive(Debug, Clone)]
enum PathKind {
    Literal { source: String, segments: Vec<Segment> },
    Pattern { prefix: String, regex: Regex },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard,
}

impl RoutePath {
    /// Parses a literal template such as `/user/:id`. A missing leading `/` is added.
    pub fn literal(path: impl Into<String>) -> Self {
        let mut source = path.into();
        if !source.starts_with('/') {
            source.insert(0, '/');
        }

        let segments = source
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "*" => Segment::Wildcard,
                _ => match segment.strip_prefix(':') {
                    Some(name) if !name.is_empty() => Segment::Param(name.to_owned()),
                    _ => Segment::Static(segment.to_owned()),
                },
            })
            .collect();

        Self { kind: PathKind::Literal { source, segments } }
    }

    /// Wraps a compiled regular expression.
    pub fn pattern(regex: Regex) -> Self {
        Self { kind: PathKind::Pattern { prefix: String::new(), regex } }
    }

    /// Compiles `pattern` into a regular expression path.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::pattern)
    }

    /// Returns this path mounted under `prefix`, the way a sub router is mounted.
    ///
    /// Literal templates are joined textually; patterns keep their expression and only
    /// match the remainder of a request path once the prefix is stripped.
    pub fn mount(&self, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return self.clone();
        }

        match &self.kind {
            PathKind::Literal { source, .. } if source == "/" => Self::literal(prefix),
            PathKind::Literal { source, .. } => Self::literal(format!("{prefix}{source}")),
            PathKind::Pattern { prefix: inner, regex } => {
                Self { kind: PathKind::Pattern { prefix: format!("{prefix}{inner}"), regex: regex.clone() } }
            }
        }
    }

    /// True for templates made only of static segments.
    pub fn is_literal(&self) -> bool {
        match &self.kind {
            PathKind::Literal { segments, .. } => segments.iter().all(|s| matches!(s, Segment::Static(_))),
            PathKind::Pattern { .. } => false,
        }
    }

    /// True for templates containing `:name` or `*` segments.
    pub fn has_params(&self) -> bool {
        match &self.kind {
            PathKind::Literal { segments, .. } => segments.iter().any(|s| !matches!(s, Segment::Static(_))),
            PathKind::Pattern { .. } => false,
        }
    }

    /// True for regular expression paths.
    pub fn is_pattern(&self) -> bool {
        matches!(self.kind, PathKind::Pattern { .. })
    }

    /// Matches a request path, returning the captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        match &self.kind {
            PathKind::Literal { segments, .. } => match_segments(segments, path),
            PathKind::Pattern { prefix, regex } => match_pattern(prefix, regex, path),
        }
    }
}

fn match_segments(segments: &[Segment], path: &str) -> Option<PathParams> {
    let mut params = PathParams::empty();
    let mut parts = path.split('/').filter(|part| !part.is_empty());

    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Wildcard => {
                // only honoured as the last segment
                if index + 1 != segments.len() {
                    return None;
                }
                let rest = parts.by_ref().collect::<Vec<_>>().join("/");
                params.push(WILDCARD_PARAM, decode(&rest)?);
                return Some(params);
            }
            Segment::Static(expected) => {
                if parts.next()? != expected {
                    return None;
                }
            }
            Segment::Param(name) => {
                let value = parts.next()?;
                params.push(name.as_str(), decode(value)?);
            }
        }
    }

    match parts.next() {
        Some(_) => None,
        None => Some(params),
    }
}

fn match_pattern(prefix: &str, regex: &Regex, path: &str) -> Option<PathParams> {
    let rest = match path.strip_prefix(prefix)? {
        "" => "/",
        rest if prefix.is_empty() || rest.starts_with('/') => rest,
        _ => return None,
    };

    let captures = regex.captures(rest)?;
    let mut params = PathParams::empty();
    let mut unnamed = 0usize;
    for (index, name) in regex.capture_names().enumerate().skip(1) {
        let key = match name {
            Some(name) => name.to_owned(),
            None => {
                let key = unnamed.to_string();
                unnamed += 1;
                key
            }
        };
        if let Some(value) = captures.get(index) {
            params.push(key, decode(value.as_str())?);
        }
    }
    Some(params)
}

fn decode(raw: &str) -> Option<Cow<'_, str>> {
    urlencoding::decode(raw).ok()
}

impl From<&str> for RoutePath {
    fn from(path: &str) -> Self {
        RoutePath::literal(path)
    }
}

impl From<String> for RoutePath {
    fn from(path: String) -> Self {
        RoutePath::literal(path)
    }
}

impl From<Regex> for RoutePath {
    fn from(regex: Regex) -> Self {
        RoutePath::pattern(regex)
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PathKind::Literal { source, .. } => f.write_str(source),
            PathKind::Pattern { prefix, regex } => write!(f, "{prefix}/{}/", regex.as_str()),
        }
    }
}

// Two paths are the same binding when they were written the same way.
impl PartialEq for RoutePath {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (PathKind::Literal { segments: a, .. }, PathKind::Literal { segments: b, .. }) => a == b,
            (PathKind::Pattern { prefix: pa, regex: ra }, PathKind::Pattern { prefix: pb, regex: rb }) => {
                pa == pb && ra.as_str() == rb.as_str()
            }
            _ => false,
        }
    }
}

impl Eq for RoutePath {}

impl Hash for RoutePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.kind {
            PathKind::Literal { segments, .. } => {
                0u8.hash(state);
                for segment in segments {
                    match segment {
                        Segment::Static(s) => (0u8, s.as_str()).hash(state),
                        Segment::Param(s) => (1u8, s.as_str()).hash(state),
                        Segment::Wildcard => 2u8.hash(state),
                    }
                }
            }
            PathKind::Pattern { prefix, regex } => {
                1u8.hash(state);
                prefix.hash(state);
                regex.as_str().hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let path = RoutePath::from("/user/export");
        assert!(path.is_literal());
        assert!(path.matches("/user/export").unwrap().is_empty());
        assert!(path.matches("/user/export/").is_some());
        assert!(path.matches("/user/1").is_none());
        assert!(path.matches("/user").is_none());
    }

    #[test]
    fn test_param_match() {
        let path = RoutePath::from("/user/:id/book/:book_id");
        assert!(path.has_params());
        assert!(!path.is_literal());

        let params = path.matches("/user/1/book/abc").unwrap();
        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.get("book_id"), Some("abc"));
        assert!(path.matches("/user/1/book").is_none());
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let path = RoutePath::from("/user/:name");
        assert_eq!(path.matches("/user/a%20b").unwrap().get("name"), Some("a b"));
        assert_eq!(path.matches("/user/%E5%BC%A0").unwrap().get("name"), Some("张"));
        assert_eq!(path.matches("/user/a+b").unwrap().get("name"), Some("a+b"));

        let files = RoutePath::from("/static/*");
        assert_eq!(files.matches("/static/my%20docs/a.txt").unwrap().get("*"), Some("my docs/a.txt"));

        let pattern = RoutePath::regex(r"^/tag/(?P<tag>[^/]+)$").unwrap();
        assert_eq!(pattern.matches("/tag/c%23").unwrap().get("tag"), Some("c#"));
    }

    #[test]
    fn test_undecodable_param_does_not_match() {
        assert!(RoutePath::from("/user/:name").matches("/user/%FF").is_none());
        assert!(RoutePath::regex(r"^/tag/(.+)$").unwrap().matches("/tag/%C3").is_none());
    }

    #[test]
    fn test_wildcard_match() {
        let path = RoutePath::from("/static/*");
        assert!(path.has_params());
        assert_eq!(path.matches("/static/css/site.css").unwrap().get("*"), Some("css/site.css"));
        assert_eq!(path.matches("/static").unwrap().get("*"), Some(""));
    }

    #[test]
    fn test_root_path() {
        let path = RoutePath::from("/");
        assert!(path.is_literal());
        assert!(path.matches("/").is_some());
        assert!(path.matches("/a").is_none());
    }

    #[test]
    fn test_missing_leading_slash_is_added() {
        assert_eq!(RoutePath::from("user").to_string(), "/user");
        assert_eq!(RoutePath::from("user"), RoutePath::from("/user"));
    }

    #[test]
    fn test_pattern_match() {
        let path = RoutePath::regex(r"^/item/(?P<id>\d+)$").unwrap();
        assert!(path.is_pattern());
        assert_eq!(path.matches("/item/12").unwrap().get("id"), Some("12"));
        assert!(path.matches("/item/abc").is_none());
    }

    #[test]
    fn test_unnamed_groups_are_numbered() {
        let path = RoutePath::regex(r"^/(\w+)/(\d+)$").unwrap();
        let params = path.matches("/book/3").unwrap();
        assert_eq!(params.get("0"), Some("book"));
        assert_eq!(params.get("1"), Some("3"));
    }

    #[test]
    fn test_mount_literal() {
        let path = RoutePath::from("/address").mount("/child-route");
        assert_eq!(path.to_string(), "/child-route/address");
        assert!(path.matches("/child-route/address").is_some());

        let root = RoutePath::from("/").mount("/child-route/");
        assert_eq!(root.to_string(), "/child-route");
    }

    #[test]
    fn test_mount_pattern_strips_prefix() {
        let path = RoutePath::regex(r"^/(?P<id>\d+)$").unwrap().mount("/user");
        assert_eq!(path.matches("/user/5").unwrap().get("id"), Some("5"));
        assert!(path.matches("/users/5").is_none());
        assert!(path.matches("/5").is_none());
    }

    #[test]
    fn test_equality_ignores_spelling_of_slashes() {
        assert_eq!(RoutePath::from("/user/:id/"), RoutePath::from("/user/:id"));
        assert_ne!(RoutePath::from("/user/:id"), RoutePath::from("/user/:name"));
        assert_ne!(RoutePath::from("/user"), RoutePath::regex("/user").unwrap());
    }
}
