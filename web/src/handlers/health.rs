//! Health check endpoint.
//!
//! Used by load balancers and monitoring systems to verify the process is up.
//! It does not touch the database.

use axum::http::StatusCode;

/// Liveness probe.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
