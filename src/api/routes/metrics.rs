//! Metrics Routes
//!
//! - GET /metrics - Prometheus exposition of the adapter's own metrics

use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body))
}
