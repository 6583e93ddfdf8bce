//! # Parameter Types
//!
//! Declared parameter types and the values bound to them.
//!
//! Path segments are captured as raw strings; the binder converts them to the
//! [`ParamType`] declared in the target's [`Signature`](crate::Signature).

use crate::error::{Error, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Bytes escaped inside one path segment (RFC 3986 path set plus `/` and `%`)
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Supported parameter types
///
/// Default is `String`: no conversion is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    /// String type (default) - no conversion
    #[default]
    String,
    /// Integer type - parses to i64
    Int,
    /// Float type - parses to f64
    Float,
    /// Boolean type - parses "true"/"false", "1"/"0", "yes"/"no"
    Bool,
}

impl ParamType {
    /// Get the type name for error messages
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A bound argument value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// String value (no conversion performed)
    String(String),
    /// Integer value (i64)
    Int(i64),
    /// Float value (f64)
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl ParamValue {
    /// Type of the held value
    #[must_use]
    pub const fn param_type(&self) -> ParamType {
        match self {
            Self::String(_) => ParamType::String,
            Self::Int(_) => ParamType::Int,
            Self::Float(_) => ParamType::Float,
            Self::Bool(_) => ParamType::Bool,
        }
    }

    /// Get as &str if String variant
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if Int variant
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if Float variant
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as bool if Bool variant
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Convert a raw captured value to the declared type
///
/// # Errors
///
/// Returns `Error::InvalidParameter` if `raw` does not parse as `param_type`.
pub fn convert_param(name: &str, raw: &str, param_type: ParamType) -> Result<ParamValue> {
    let invalid = || Error::InvalidParameter {
        name: name.to_string(),
        expected: param_type.type_name(),
        value: raw.to_string(),
    };

    match param_type {
        ParamType::String => Ok(ParamValue::String(raw.to_string())),
        ParamType::Int => raw.parse::<i64>().map(ParamValue::Int).map_err(|_| invalid()),
        ParamType::Float => raw
            .parse::<f64>()
            .map(ParamValue::Float)
            .map_err(|_| invalid()),
        ParamType::Bool => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(ParamValue::Bool(true)),
            "false" | "0" | "no" => Ok(ParamValue::Bool(false)),
            _ => Err(invalid()),
        },
    }
}

/// Placeholder name of a path segment
///
/// - `:id` -> `Some("id")`
/// - `users` -> `None`
#[must_use]
pub fn placeholder_name(segment: &str) -> Option<&str> {
    segment.strip_prefix(':')
}

/// Split a path into segments
///
/// A single leading and a single trailing empty segment (from a leading or
/// trailing `/`) are dropped; inner empty segments are kept.
#[must_use]
pub fn split_path(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.first() == Some(&"") {
        segments.remove(0);
    }
    if segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}

/// Percent-encode a value for use as one path segment
#[must_use]
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Percent-decode one request path segment
///
/// Invalid UTF-8 after decoding is replaced, never rejected.
#[must_use]
pub fn decode_segment(segment: &str) -> Cow<'_, str> {
    percent_decode_str(segment).decode_utf8_lossy()
}
