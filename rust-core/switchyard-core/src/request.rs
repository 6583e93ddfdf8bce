//! # HTTP Request
//!
//! The current request as seen by the dispatcher and by action targets.
//!
//! The dispatcher only reads the path. Targets that declare a request
//! parameter get the whole object, including the parameter set into which
//! the bound path values are merged before invocation.

use crate::error::{Error, Result};
use crate::params::BoundParams;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::HeaderMap;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use url::form_urlencoded;

/// HTTP methods understood by the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Convert from hyper's method type
    #[must_use]
    pub fn from_hyper(method: &hyper::Method) -> Option<Self> {
        Some(match *method {
            hyper::Method::GET => Self::Get,
            hyper::Method::POST => Self::Post,
            hyper::Method::PUT => Self::Put,
            hyper::Method::DELETE => Self::Delete,
            hyper::Method::PATCH => Self::Patch,
            hyper::Method::HEAD => Self::Head,
            hyper::Method::OPTIONS => Self::Options,
            _ => return None,
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        })
    }
}

/// The current request
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Raw query string (e.g., "page=1&limit=10")
    query_string: Option<String>,
    /// Query parameters plus the bound path values of the matched action
    params: HashMap<String, String>,
    /// Request headers
    headers: HeaderMap,
    /// Request body (collected)
    body: Option<Bytes>,
}

impl Request {
    /// Create a request manually (tests, internal use)
    ///
    /// `path` may carry a query string.
    #[must_use]
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers_map: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Self {
        let path = path.into();
        let (path, query_string) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path, None),
        };

        let mut headers = HeaderMap::new();
        for (k, v) in headers_map {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(&v),
            ) {
                headers.insert(n, v);
            }
        }

        Self {
            method,
            path,
            params: parse_query_string(query_string.as_deref()),
            query_string,
            headers,
            body,
        }
    }

    /// Shorthand for a body-less GET request
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, HashMap::new(), None)
    }

    /// Create from a hyper request, rejecting bodies above `max_body_size`
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` if the body exceeds the limit and
    /// `Error::Decode` for unsupported methods or unreadable bodies
    pub async fn from_hyper_with_limit(
        req: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        let method = Method::from_hyper(req.method()).ok_or_else(|| Error::Decode {
            reason: format!("unsupported method {}", req.method()),
        })?;

        let uri = req.uri();
        let path = uri.path().to_string();
        let query_string = uri.query().map(String::from);

        let headers = req.headers().clone();
        let declared_len = headers
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<usize>().ok());
        if let Some(content_len) = declared_len {
            if content_len > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                    actual: content_len,
                });
            }
        }

        let bytes = BodyExt::collect(req.into_body())
            .await
            .map_err(|e| Error::Decode {
                reason: format!("failed to read body: {e}"),
            })?
            .to_bytes();
        if bytes.len() > max_body_size {
            return Err(Error::PayloadTooLarge {
                limit: max_body_size,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            method,
            path,
            params: parse_query_string(query_string.as_deref()),
            query_string,
            headers,
            body: (!bytes.is_empty()).then_some(bytes),
        })
    }

    /// Get a request parameter (query value or bound path value)
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All request parameters
    #[must_use]
    pub const fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Set or override a request parameter
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Merge bound path values into the parameter set (bound values win)
    pub fn merge_params(&mut self, bound: &BoundParams) {
        for (name, value) in bound.iter() {
            self.set_param(name, value);
        }
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// Get raw query string
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Get the request body as bytes
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Get the request body as string (UTF-8)
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Parse the body as JSON
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the body is missing or not valid JSON for `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body_bytes().ok_or_else(|| Error::Decode {
            reason: "request has no body".to_string(),
        })?;
        crate::json::parse_json_bytes(body)
    }
}

/// Parse query string into a map (duplicate keys: last value wins)
fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_string_simple() {
        let result = parse_query_string(Some("page=1&limit=10"));
        assert_eq!(result.get("page"), Some(&"1".to_string()));
        assert_eq!(result.get("limit"), Some(&"10".to_string()));
    }

    #[test]
    fn test_parse_query_string_empty() {
        assert!(parse_query_string(None).is_empty());
    }

    #[test]
    fn test_parse_query_string_url_encoded() {
        let result = parse_query_string(Some("name=John+Doe&city=New%20York"));
        assert_eq!(result.get("name"), Some(&"John Doe".to_string()));
        assert_eq!(result.get("city"), Some(&"New York".to_string()));
    }

    #[test]
    fn test_new_splits_query() {
        let req = Request::get("/users?page=2");
        assert_eq!(req.path, "/users");
        assert_eq!(req.query_string(), Some("page=2"));
        assert_eq!(req.param("page"), Some("2"));
    }

    #[test]
    fn test_merge_params_overrides_query() {
        let mut req = Request::get("/user/7?id=1&tab=info");
        let bound = BoundParams::from([("id", "7")]);
        req.merge_params(&bound);
        assert_eq!(req.param("id"), Some("7"));
        assert_eq!(req.param("tab"), Some("info"));
    }

    #[test]
    fn test_headers() {
        let mut headers = HashMap::new();
        headers.insert("X-Request-Id".to_string(), "abc".to_string());
        let mut req = Request::new(Method::Post, "/", headers, None);
        assert_eq!(req.header("x-request-id"), Some("abc"));
        req.set_header("x-client-ip", "127.0.0.1");
        assert_eq!(req.header("X-Client-Ip"), Some("127.0.0.1"));
    }

    #[test]
    fn test_json_body() {
        let req = Request::new(
            Method::Post,
            "/users",
            HashMap::new(),
            Some(Bytes::from_static(br#"{"name": "Ann"}"#)),
        );
        let body: serde_json::Value = req.json().unwrap();
        assert_eq!(body["name"], "Ann");
        assert!(Request::get("/").json::<serde_json::Value>().is_err());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::from_hyper(&hyper::Method::PATCH), Some(Method::Patch));
        assert_eq!(Method::from_hyper(&hyper::Method::TRACE), None);
    }
}
