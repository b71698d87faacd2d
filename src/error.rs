//! Error types for the expire map
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Expire Map Error Enum ==
/// Unified error type for the store and its HTTP surface.
#[derive(Error, Debug)]
pub enum ExpireMapError {
    /// The background reaper thread could not be started
    #[error("Failed to start reaper thread: {0}")]
    ReaperSpawn(#[source] std::io::Error),

    /// Key not found (absent or already reaped)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ExpireMapError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExpireMapError::NotFound(_) => StatusCode::NOT_FOUND,
            ExpireMapError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ExpireMapError::ReaperSpawn(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the expire map.
pub type Result<T> = std::result::Result<T, ExpireMapError>;
