//! Remote Read Route
//!
//! - ANY /api/v1/read - Prometheus remote read endpoint
//!
//! The body is a snappy compressed (raw block format) `ReadRequest` and the
//! response a snappy compressed `ReadResponse`. Matchers named in `ignore`
//! query parameters are not forwarded to the store:
//! `/api/v1/read?ignore=cluster&ignore=env,region`.

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
};
use prost::Message;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::proto::prompb::{ReadRequest, ReadResponse};
use crate::read::IgnoredMatchers;

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// ANY /api/v1/read
pub async fn remote_read(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> ApiResult<Response> {
    let request = decode_request(&body)?;
    let ignored = IgnoredMatchers::from_query_string(query.as_deref());

    tracing::debug!(queries = request.queries.len(), "Remote read request");

    let read = state.reader.read(&request, &ignored);
    let response = match state.config.request_timeout {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .map_err(|_| ApiError::Timeout(limit))??,
        None => read.await?,
    };

    let body = encode_response(&response)?;
    Ok((
        [
            (header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE),
            (header::CONTENT_ENCODING, "snappy"),
        ],
        body,
    )
        .into_response())
}

/// Decompress and decode a remote read request body
pub fn decode_request(body: &[u8]) -> ApiResult<ReadRequest> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty request body".to_string()));
    }

    let raw = snap::raw::Decoder::new()
        .decompress_vec(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid snappy payload: {}", e)))?;

    ReadRequest::decode(raw.as_slice())
        .map_err(|e| ApiError::BadRequest(format!("invalid ReadRequest: {}", e)))
}

/// Encode and compress a remote read response body
pub fn encode_response(response: &ReadResponse) -> ApiResult<Vec<u8>> {
    snap::raw::Encoder::new()
        .compress_vec(&response.encode_to_vec())
        .map_err(|e| ApiError::Internal(format!("Failed to compress response: {}", e)))
}
