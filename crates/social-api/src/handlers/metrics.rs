//! Prometheus metrics endpoint handler.
//!
//! Unauthenticated and outside `/v1`, so scrapes are never rate limited.
//! Labels carry no user identifiers.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// ```text
/// # TYPE social_rate_limit_decisions_total counter
/// social_rate_limit_decisions_total{decision="allowed"} 42
/// ```
#[tracing::instrument(skip_all, name = "social.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
