//! Health Routes
//!
//! - GET /-/healthy - Liveness probe, no dependency checks

/// GET /-/healthy
pub async fn healthy() -> &'static str {
    "ok"
}
