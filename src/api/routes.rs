//! API Routes
//!
//! Binds the expire map handlers to their paths.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, set_handler, stats_handler, AppState,
};

/// Builds the router over a shared expire map.
///
/// Writes go through `PUT /set` with an optional `ttl_ms`; reads report the
/// remaining ttl; `/stats` exposes the store counters and the time until the
/// next expiry.
pub fn create_router(state: AppState) -> Router {
    let entries = Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler));

    let introspection = Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler));

    entries
        .merge(introspection)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
