//! Expire Map - A thread-safe key-value store with per-entry TTL
//!
//! Every entry carries its own deadline. A single background reaper thread per
//! store sleeps until the nearest deadline and sweeps everything that is due.

pub mod api;
pub mod config;
pub mod error;
pub mod expiry;
pub mod models;
mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::ExpireMapError;
pub use expiry::{ExpireMap, ExpiryStats};
