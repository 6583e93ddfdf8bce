//! # HTTP Response
//!
//! Response value produced by action targets and returned by the dispatcher.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

const CONTENT_TYPE: &str = "content-type";

/// HTTP response: status, multi-valued headers and a byte body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Headers keyed by lower-case name
    pub headers: HashMap<String, Vec<String>>,
    /// Response body
    pub body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }
}

impl Response {
    /// Create a text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Bytes::from(body.into()),
            ..Self::default()
        }
        .with_header(CONTENT_TYPE, "text/plain; charset=utf-8")
    }

    /// Create a JSON response from an already serialized body
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: Bytes::from(body.into()),
            ..Self::default()
        }
        .with_header(CONTENT_TYPE, "application/json")
    }

    /// Create a JSON response by serializing `value`
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails
    pub fn json_value<T: Serialize>(value: &T) -> crate::Result<Self> {
        Ok(Self::json(crate::json::to_json(value)?))
    }

    /// JSON error payload `{"error": message}` with the given status
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(serde_json::json!({ "error": message }).to_string()).with_status(status)
    }

    /// 404 response
    #[must_use]
    pub fn not_found() -> Self {
        Self::error(404, "Not Found")
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set header, replacing previous values
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        self.headers
            .insert(key.to_ascii_lowercase(), vec![value.to_string()]);
    }

    /// Append a value to a header
    pub fn add_header(&mut self, key: &str, value: &str) {
        self.headers
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
    }

    /// First value of a header (case-insensitive)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Content type, if set
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    /// Body as UTF-8 text
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Convert to hyper Response
    pub(crate) fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = hyper::Response::new(Full::new(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (key, values) in &self.headers {
            let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
                warn!(header = %key, "Dropping invalid response header name");
                continue;
            };
            for value in values {
                match HeaderValue::from_str(value) {
                    Ok(value) => {
                        headers.append(name.clone(), value);
                    }
                    Err(_) => warn!(header = %key, "Dropping invalid response header value"),
                }
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_json() {
        let resp = Response::json(r#"{"status": "ok"}"#);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type(), Some("application/json"));
    }

    #[test]
    fn test_response_with_status() {
        let resp = Response::text("Not Found").with_status(404);
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body_str(), Some("Not Found"));
    }

    #[test]
    fn test_not_found_payload() {
        let resp = Response::not_found();
        assert_eq!(resp.status, 404);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["error"], "Not Found");
    }

    #[test]
    fn test_headers_case_insensitive_and_multi_valued() {
        let mut resp = Response::text("x").with_header("X-Tag", "a");
        resp.add_header("x-tag", "b");
        assert_eq!(resp.header("X-TAG"), Some("a"));
        assert_eq!(resp.headers["x-tag"], vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_into_hyper() {
        let mut resp = Response::json("{}").with_status(201);
        resp.add_header("set-cookie", "a=1");
        resp.add_header("set-cookie", "b=2");
        let hyper_resp = resp.into_hyper();
        assert_eq!(hyper_resp.status(), StatusCode::CREATED);
        assert_eq!(hyper_resp.headers().get_all("set-cookie").iter().count(), 2);
    }

    #[test]
    fn test_json_value() {
        let resp = Response::json_value(&serde_json::json!({"id": 5})).unwrap();
        assert_eq!(resp.body_str(), Some(r#"{"id":5}"#));
    }
}
