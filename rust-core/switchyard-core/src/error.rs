//! # Error Handling
//!
//! Centralized error types for Switchyard core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Errors fall in three groups:
//!
//! - configuration time (`DuplicateRoute`, `DuplicateRouteName`, `InvalidTarget`,
//!   `Config`): raised while building the [`Registry`](crate::Registry), before
//!   any traffic is served
//! - request time (`ActionNotFound`, `MissingParameter`, `InvalidParameter`, ...):
//!   mapped to responses by the [`Dispatcher`](crate::Dispatcher)
//! - propagated (`Handler`): business errors raised inside a target

use thiserror::Error;

/// Result type alias for Switchyard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Switchyard runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// An action is already registered for this path
    #[error("Action for path \"{path}\" already exists")]
    DuplicateRoute {
        /// The duplicated action path
        path: String,
    },

    /// A route with this name is already registered
    #[error("Route with name \"{name}\" already exists")]
    DuplicateRouteName {
        /// The duplicated route name
        name: String,
    },

    /// The trie holds no action for the requested path
    #[error("No action found for path: {path}")]
    ActionNotFound {
        /// The path that wasn't matched
        path: String,
    },

    /// Reverse resolution of an unknown route name
    #[error("Route with name \"{name}\" not found")]
    RouteNotFound {
        /// The unknown route name
        name: String,
    },

    /// Action target is malformed (unknown controller, missing method, ...)
    #[error("Invalid action target {target}: {reason}")]
    InvalidTarget {
        /// Target as given at registration
        target: String,
        /// Reason for invalidity
        reason: String,
    },

    /// A declared parameter has no bound value and no default
    #[error("Parameter `{name}` is not set for the action target")]
    MissingParameter {
        /// The unbound parameter
        name: String,
    },

    /// A bound value could not be converted to the declared type
    #[error("Parameter `{name}` expects {expected}, got \"{value}\"")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Declared type name
        expected: &'static str,
        /// Raw value captured from the path
        value: String,
    },

    /// A target read a positional argument as the wrong kind
    #[error("Argument #{index} is not {expected}")]
    ArgumentType {
        /// Position in the argument list
        index: usize,
        /// Requested kind
        expected: &'static str,
    },

    /// Error raised by a target's own logic
    #[error("Action handler failed: {0}")]
    Handler(#[from] anyhow::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload could not be decoded
    #[error("Decode error: {reason}")]
    Decode {
        /// Reason reported by the decoder
        reason: String,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },
}

impl Error {
    /// Whether the error can only come from route registration
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateRoute { .. }
                | Self::DuplicateRouteName { .. }
                | Self::InvalidTarget { .. }
                | Self::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_not_found_error() {
        let err = Error::ActionNotFound {
            path: "/unknown".to_string(),
        };
        assert!(err.to_string().contains("/unknown"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_bind_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = Error::BindError {
            address: "0.0.0.0:8000".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("0.0.0.0:8000"));
    }

    #[test]
    fn test_configuration_errors() {
        let err = Error::DuplicateRouteName {
            name: "profile".to_string(),
        };
        assert!(err.is_configuration());
        assert!(err.to_string().contains("profile"));
    }

    #[test]
    fn test_handler_error_from_anyhow() {
        let err: Error = anyhow::anyhow!("database down").into();
        assert!(matches!(err, Error::Handler(_)));
        assert!(err.to_string().contains("database down"));
    }
}
