//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::config::Config;
use crate::error::{ExpireMapError, Result};
use crate::expiry::ExpireMap;
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The map does its own locking, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The expire map served over HTTP
    pub map: Arc<ExpireMap<String, String>>,
    /// TTL applied when a request does not specify one
    pub default_ttl_ms: u64,
    /// Largest TTL a request may ask for
    pub max_ttl_ms: u64,
}

impl AppState {
    /// Creates a new AppState around an existing map.
    pub fn new(map: ExpireMap<String, String>, default_ttl_ms: u64, max_ttl_ms: u64) -> Self {
        Self {
            map: Arc::new(map),
            default_ttl_ms,
            max_ttl_ms,
        }
    }

    /// Creates a new AppState from configuration, starting a fresh map.
    ///
    /// # Errors
    /// Fails if the map's reaper thread cannot be started.
    pub fn from_config(config: &Config) -> Result<Self> {
        let map = ExpireMap::new()?;
        Ok(Self::new(map, config.default_ttl_ms, config.max_ttl_ms))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair, replacing any existing entry and its ttl.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate(state.max_ttl_ms) {
        return Err(ExpireMapError::InvalidRequest(error_msg));
    }

    let ttl_ms = req.ttl_ms.unwrap_or(state.default_ttl_ms);
    state.map.insert_ms(req.key.clone(), req.value, ttl_ms);

    Ok(Json(SetResponse::new(req.key, ttl_ms)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value and its remaining ttl.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let (value, ttl) = state
        .map
        .get_with_ttl(&key)
        .ok_or_else(|| ExpireMapError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value, millis(ttl))))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key. Reports 404 when nothing was removed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state
        .map
        .remove(&key)
        .ok_or_else(|| ExpireMapError::NotFound(key.clone()))?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
///
/// Returns current store counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let (stats, next_expiry) = state.map.stats_with_next_expiry();

    Json(StatsResponse::new(stats, next_expiry.map(millis)))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
