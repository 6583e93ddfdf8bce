//! # JSON Helpers
//!
//! Request bodies are parsed with simd-json; responses and error payloads are
//! serialized with `serde_json`.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parse JSON bytes to a typed value using simd-json
///
/// simd-json parses in place, so the input is copied first.
///
/// # Errors
///
/// Returns `Error::Decode` if parsing fails
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut buffer = bytes.to_vec();
    simd_json::from_slice(&mut buffer).map_err(|e| Error::Decode {
        reason: format!("JSON parse error: {e}"),
    })
}

/// Parse a JSON string to a typed value
///
/// # Errors
///
/// Returns `Error::Decode` if parsing fails
pub fn parse_json<T: DeserializeOwned>(json_str: &str) -> Result<T> {
    parse_json_bytes(json_str.as_bytes())
}

/// Serialize a value to a JSON string
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
