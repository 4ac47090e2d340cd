//! Rate limiting middleware.
//!
//! Requests are keyed by client IP: the first `X-Forwarded-For` hop, then
//! `X-Real-IP`, then the socket peer address. A rejected request is answered
//! with `429` and a `Retry-After` header and never reaches the handler.

use crate::errors::ApiError;
use crate::observability::metrics;
use crate::rate_limiter::RateLimitDecision;
use crate::routes::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::instrument;

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate limit key for a request.
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    peer.map_or_else(|| UNKNOWN_CLIENT.to_string(), |ip| ip.to_string())
}

/// Admission middleware for `/v1` routes.
#[instrument(skip_all, name = "social.middleware.rate_limit")]
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let key = client_key(req.headers(), peer);

    match state.rate_limiter.allow(&key) {
        RateLimitDecision::Allowed => {
            metrics::record_rate_limit_decision("allowed");
            Ok(next.run(req).await)
        }
        RateLimitDecision::Rejected { retry_after } => {
            metrics::record_rate_limit_decision("rejected");
            tracing::info!(
                target: "social.ratelimit",
                retry_after_ms = retry_after.as_millis() as u64,
                "Request rejected by rate limiter"
            );
            Err(ApiError::RateLimitExceeded { retry_after })
        }
    }
}
