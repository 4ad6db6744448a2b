//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default port of the monitoring server.
pub const DEFAULT_PORT: u16 = 8085;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `DRIFTWATCH_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `DRIFTWATCH_PORT`: The port to listen on (default: 8085)
/// - `DRIFTWATCH_CONFIG`: Path of the monitoring YAML file (default: "config.yaml")
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Path of the monitoring configuration file.
    pub config_path: PathBuf,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DRIFTWATCH_PORT` is set but cannot be parsed as a valid port number
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let host = std::env::var("DRIFTWATCH_HOST").unwrap_or(defaults.host);

        let port = std::env::var("DRIFTWATCH_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()?
            .unwrap_or(defaults.port);

        let config_path = std::env::var("DRIFTWATCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or(defaults.config_path);

        Ok(Self {
            host,
            port,
            config_path,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            config_path: PathBuf::from("config.yaml"),
        }
    }
}
