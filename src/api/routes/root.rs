//! Index page and fallback

use axum::{http::StatusCode, response::Html};

const INDEX: &str = r#"<!DOCTYPE html>
<title>thanos-remote-read</title>
<p>thanos-remote-read adapter</p>
<ul>
  <li><a href="/-/healthy">/-/healthy</a></li>
  <li><a href="/metrics">/metrics</a></li>
  <li>/api/v1/read (point Prometheus here!)</li>
</ul>
"#;

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX)
}

/// Anything not routed
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}
