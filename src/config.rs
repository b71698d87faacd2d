//! Configuration Module
//!
//! Loads settings for the HTTP front end from environment variables.
//! The store itself takes no configuration.

use std::env;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// TTL in milliseconds applied when a request does not specify one
    pub default_ttl_ms: u64,
    /// Largest TTL in milliseconds a request may ask for
    pub max_ttl_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 60000)
    /// - `MAX_TTL_MS` - Maximum accepted TTL in milliseconds (default: 86400000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            default_ttl_ms: parse_var("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            max_ttl_ms: parse_var("MAX_TTL_MS").unwrap_or(defaults.max_ttl_ms),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_ttl_ms: 60_000,
            max_ttl_ms: 86_400_000,
        }
    }
}
