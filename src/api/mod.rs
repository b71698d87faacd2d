//! API Module
//!
//! HTTP handlers and routing that expose one expire map over a REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair with a ttl in milliseconds
//! - `GET /get/:key` - Retrieve a value and its remaining ttl
//! - `DELETE /del/:key` - Delete a key
//! - `GET /stats` - Get store counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
