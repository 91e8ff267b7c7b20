//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::read::ReadError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request body is not a snappy compressed `ReadRequest`
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Answering the read failed
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The read did not finish in time
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status and machine readable code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Read(e) => match e {
                ReadError::Transport(status) if status.code() == tonic::Code::Unavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
                }
                ReadError::Connect(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
                ReadError::Transport(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
                ReadError::BackendWarning(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORE_WARNING")
                }
                ReadError::Translation(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "TRANSLATION_ERROR")
                }
                ReadError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DECODE_ERROR"),
            },
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Remote read failed"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Rejected remote read request"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
