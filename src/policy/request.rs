//! Request view evaluated by the policy engine.
//!
//! # Responsibilities
//! - Hold the parts of an inbound request the checks may look at
//! - Extract a named parameter from a header or the query string
//!
//! # Design Decisions
//! - Detached from the transport: built by the HTTP adapter, owned by one evaluation
//! - Headers keep multimap semantics; lookups return the first value
//! - The body is carried only for logging, no strategy reads it

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Where a rule reads its parameter from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Header,
    Query,
}

impl std::fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamLocation::Header => write!(f, "header"),
            ParamLocation::Query => write!(f, "query"),
        }
    }
}

/// A location plus the header or query parameter name.
#[derive(Debug, Clone)]
pub struct ParamSource {
    pub location: ParamLocation,
    pub name: String,
}

impl ParamSource {
    pub fn new(location: ParamLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            name: name.into(),
        }
    }

    /// Returns the parameter value, or `None` when it is absent or empty.
    pub fn extract<'r>(&self, request: &'r CheckRequest) -> Option<&'r str> {
        let value = match self.location {
            ParamLocation::Header => request.header(&self.name),
            ParamLocation::Query => request.query_param(&self.name),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Read-only description of the request being authorized.
///
/// Only the modifier pipeline mutates it (path and headers), before any check runs.
#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    pub method: String,
    pub host: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CheckRequest {
    /// Build a request view from a path that may carry a query string.
    pub fn new(method: impl Into<String>, host: impl Into<String>, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (path_and_query, Vec::new()),
        };

        Self {
            method: method.into(),
            host: host.into(),
            path: path.to_string(),
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Builder-style header insertion, mostly for tests.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Request path without any trailing query string.
    pub fn path_only(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }
}

/// Decode an `application/x-www-form-urlencoded` query string into ordered pairs.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_split_and_decode() {
        let req = CheckRequest::new("GET", "example.com", "/a/b?v=v2&x=hello%20world&v=v3");
        assert_eq!(req.path, "/a/b");
        assert_eq!(req.query_param("v"), Some("v2"));
        assert_eq!(req.query_param("x"), Some("hello world"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = CheckRequest::new("GET", "example.com", "/")
            .with_header("X-Forwarded-For", "10.0.0.1")
            .with_header("x-forwarded-for", "10.0.0.2");
        assert_eq!(req.header("x-forwarded-for"), Some("10.0.0.1"));
    }

    #[test]
    fn test_empty_param_is_missing() {
        let req = CheckRequest::new("GET", "example.com", "/?token=").with_header("auth", "");
        assert!(ParamSource::new(ParamLocation::Query, "token").extract(&req).is_none());
        assert!(ParamSource::new(ParamLocation::Header, "auth").extract(&req).is_none());
    }
}
