//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Liveness check.
///
/// Does not touch the database or cache, so a degraded dependency does not
/// take the pod out of rotation.
///
/// ```json
/// { "status": "ok", "env": "development", "version": "0.1.0" }
/// ```
#[instrument(skip_all, name = "social.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        env: state.config.app_env.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
