//! Shim configuration.

use serde::{Deserialize, Serialize};

/// Port the host platform expects the action to listen on.
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration for the invocation shim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShimConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on. `0` asks the OS for an ephemeral port.
    pub port: u16,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ShimConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
