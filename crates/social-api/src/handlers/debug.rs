//! Runtime variables for operators (`GET /v1/debug/vars`, basic auth).

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Serialize)]
pub struct DebugVars {
    pub version: &'static str,
    pub env: String,
    pub uptime_seconds: u64,
    pub rate_limit: RateLimitVars,
}

#[derive(Debug, Serialize)]
pub struct RateLimitVars {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_seconds: u64,
    pub tracked_keys: usize,
}

#[instrument(skip_all, name = "social.debug.vars")]
pub async fn debug_vars(State(state): State<Arc<AppState>>) -> Json<DebugVars> {
    let limiter = &state.config.rate_limiter;

    Json(DebugVars {
        version: env!("CARGO_PKG_VERSION"),
        env: state.config.app_env.clone(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        rate_limit: RateLimitVars {
            enabled: limiter.enabled,
            requests_per_window: limiter.requests_per_window,
            window_seconds: limiter.window.as_secs(),
            tracked_keys: state.rate_limiter.tracked_keys(),
        },
    })
}
