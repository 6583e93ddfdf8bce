//! # Switchyard Core
//!
//! Routing and action-dispatch engine for the Switchyard web framework.
//! Maps URL paths to actions, binds path values to target parameters and
//! builds URLs back from route names.
//!
//! ## Architecture
//!
//! Two phases. During registration a [`Registry`] collects actions; sealing it
//! yields an immutable [`SealedRegistry`] which a [`Dispatcher`] shares with
//! every request worker:
//!
//! ```text
//! path -> ActionTrie match -> validators -> bind -> target -> Response
//! ```
//!
//! ## Modules
//!
//! - `trie` - Segment trie with literal-over-placeholder precedence
//! - `route` - Named routes and reverse URL building
//! - `binder` - Declared parameters and argument binding
//! - `validation` - Validators and structured validation errors
//! - `action` - Actions, closure and controller targets
//! - `registry` - Registration builder and its sealed form
//! - `dispatcher` - Request pipeline
//! - `request` / `response` - HTTP value objects
//! - `server` - HTTP host built on Hyper
//! - `config` - Server settings and route files
//! - `json` - JSON parsing with simd-json
//! - `types` - Parameter types and conversion
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod binder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod json;
pub mod params;
pub mod registry;
pub mod request;
pub mod response;
pub mod route;
pub mod server;
pub mod trie;
pub mod types;
pub mod validation;

pub use action::{
    Action, Controller, ControllerClass, ControllerFactory, HandlerResult, Invoke, Target,
};
pub use binder::{bind, Arg, Args, Signature};
pub use config::{AppConfig, RouteConfig, ServerConfig};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use json::{parse_json, to_json};
pub use params::BoundParams;
pub use registry::{Registry, SealedRegistry};
pub use request::{Method, Request};
pub use response::Response;
pub use route::{build_url, RouteTable};
pub use server::Server;
pub use trie::ActionTrie;
pub use types::{ParamType, ParamValue};
pub use validation::{
    FieldError, ValidationCode, ValidationErrors, ValidationResult, Validator, ValidatorChain,
};

use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the JSON log subscriber
///
/// Honors `RUST_LOG`; defaults to `switchyard=info`. Calling it again is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("switchyard=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init();
}
