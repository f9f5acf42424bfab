//! Prometheus exposition of the business metrics.
//!
//! The server installs one global recorder at startup and serves its
//! rendering at `GET /metrics`, outside `/api` and without an identity.

use anyhow::Context;
use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Content type of the Prometheus text format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Install the global Prometheus recorder and describe the business metrics.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    roomly_engine::metrics::register_business_metrics();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Router serving `GET /metrics` from `handle`.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .with_state(handle)
}

async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], handle.render())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_metrics_endpoint_renders_business_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            roomly_engine::metrics::record_reservation_created();
            roomly_engine::metrics::record_reservation_conflict("slot_taken");
            roomly_engine::metrics::record_points_awarded("COMMENT", 5);
        });

        let server = TestServer::new(metrics_router(handle)).unwrap();
        let response = server.get("/metrics").await;
        response.assert_status_ok();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            PROMETHEUS_CONTENT_TYPE
        );

        let body = response.text();
        assert!(body.contains("roomly_reservations_created_total 1"));
        assert!(body.contains(r#"roomly_reservation_conflicts_total{reason="slot_taken"} 1"#));
        assert!(body.contains(r#"roomly_points_awarded_total{action="COMMENT"} 5"#));
    }
}
