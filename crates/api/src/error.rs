//! HTTP error responses

use alerting::BatchError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use storage::StoreError;
use thiserror::Error;
use tracing::error;

/// Request-level failures; per-alert failures travel in the batch result
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid Content-Type, expecting JSON")]
    UnsupportedContentType,

    #[error(transparent)]
    MalformedBatch(#[from] BatchError),

    /// Team or severity not usable as a log key
    #[error("Invalid log key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedContentType
            | ApiError::MalformedBatch(_)
            | ApiError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
