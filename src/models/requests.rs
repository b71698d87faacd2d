//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The key to store the value under
/// - `value`: The value to store
/// - `ttl_ms`: Optional TTL in milliseconds (server default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetRequest {
    /// Validates the request data against the largest accepted ttl.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self, max_ttl_ms: u64) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        match self.ttl_ms {
            Some(0) => Some("TTL must be greater than zero".to_string()),
            Some(ttl) if ttl > max_ttl_ms => Some(format!(
                "TTL of {} ms exceeds maximum of {} ms",
                ttl, max_ttl_ms
            )),
            _ => None,
        }
    }
}
