//! HTTP API
//!
//! HTTP layer of the adapter, built with Axum.
//!
//! # Endpoints
//!
//! - `ANY /api/v1/read` - Prometheus remote read (snappy + protobuf)
//! - `GET /-/healthy` - Liveness probe
//! - `GET /metrics` - Prometheus metrics of the adapter itself
//! - `GET /` - Index page
//!
//! Everything else is answered with 404.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use thanos_remote_read::api::{serve, ApiConfig, AppState};
//! use thanos_remote_read::metrics::Metrics;
//! use thanos_remote_read::read::{ReadOptions, RemoteReader};
//! use thanos_remote_read::store::GrpcStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(GrpcStore::new("localhost:10901", Duration::from_secs(5))?);
//!     let metrics = Arc::new(Metrics::new());
//!     let reader = RemoteReader::new(store, ReadOptions::default(), Arc::clone(&metrics));
//!
//!     serve(AppState::new(reader, metrics, ApiConfig::default())).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::metrics::Metrics;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;
    let metrics = Arc::clone(&state.metrics);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route(
            "/api/v1/read",
            any(routes::read::remote_read).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/-/healthy", get(routes::health::healthy))
        .route("/metrics", get(routes::metrics::metrics))
        .route("/", get(routes::root::index))
        .fallback(routes::root::not_found)
        .layer(middleware::from_fn_with_state(metrics, track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Count every request by status code, method and handler
async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_string();
    let handler = handler_name(request.uri().path());

    let response = next.run(request).await;
    metrics.record_request(response.status().as_u16(), &method, handler);
    response
}

fn handler_name(path: &str) -> &'static str {
    match path {
        "/api/v1/read" => "read",
        "/-/healthy" => "health",
        "/metrics" => "metrics",
        _ => "root",
    }
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.listen;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("thanos-remote-read listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("thanos-remote-read shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
