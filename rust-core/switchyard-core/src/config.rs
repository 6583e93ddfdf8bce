//! # Configuration
//!
//! Server settings and route lists, loadable from JSON.
//!
//! ```json
//! {
//!   "server": { "address": "0.0.0.0:8080", "max_body_size": 65536 },
//!   "routes": [
//!     { "name": "user.show", "path": "/user/:id", "target": "UserController@show" }
//!   ]
//! }
//! ```
//!
//! Every field is optional; missing ones take the defaults of
//! [`ServerConfig::default`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// HTTP Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            keep_alive: true,
            shutdown_timeout_secs: 30,
            max_body_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Shutdown timeout for graceful shutdown
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// One route entry of a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route name used for reverse routing
    pub name: String,
    /// Action path, e.g. `/user/:id`
    pub path: String,
    /// Target written as `Controller@method`
    pub target: String,
}

/// Whole application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server settings
    pub server: ServerConfig,
    /// Routes registered at startup
    pub routes: Vec<RouteConfig>,
}

impl AppConfig {
    /// Parse a JSON configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is not a valid configuration
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("invalid configuration: {e}"),
        })
    }

    /// Load a JSON configuration file
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json(&content)
    }
}
