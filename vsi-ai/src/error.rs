//! Error types for vsi-ai
//!
//! - `AnalysisError`: the single terminal error of an analysis run
//! - `ApiError`: HTTP rendering of failures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::inference_client::InferenceError;

/// Analysis run failure
///
/// Malformed model output is never an error; it degrades to an empty result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Rejected before any inference call (bad chunk size, empty batch)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An inference call failed (after retries); the whole run is discarded
    #[error("Inference failed for chunk {chunk_index}: {source}")]
    Inference {
        chunk_index: usize,
        #[source]
        source: InferenceError,
    },
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Inference provider failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Inference provider timed out (504)
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// vsi-common error
    #[error("Common error: {0}")]
    Common(#[from] vsi_common::Error),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        let message = err.to_string();
        match err {
            AnalysisError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            AnalysisError::Inference { ref source, .. } if source.is_timeout() => {
                ApiError::UpstreamTimeout(message)
            }
            AnalysisError::Inference { .. } => ApiError::Upstream(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::UpstreamTimeout(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT", msg)
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => match err {
                vsi_common::Error::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                vsi_common::Error::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    err.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
