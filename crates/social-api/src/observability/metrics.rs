//! Metrics definitions for Social API.
//!
//! All metrics follow Prometheus naming conventions:
//! - `social_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: parameterized paths (ids replaced by placeholders)
//! - `decision`, `outcome`, `result`, `kind`: fixed sets defined in code
//!
//! Client keys, user ids and tokens are never used as labels.

use metrics::{counter, histogram};
use std::time::Duration;

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `social_http_requests_total`, `social_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("social_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("social_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/v1/health"
        | "/metrics"
        | "/v1/authentication/token"
        | "/v1/authentication/user"
        | "/v1/debug/vars" => {
            path.to_string()
        }
        _ => normalize_dynamic_endpoint(path),
    }
}

/// Replace trailing id/token segments with placeholders.
fn normalize_dynamic_endpoint(path: &str) -> String {
    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match parts.as_slice() {
        ["v1", "users", "activate", _] => "/v1/users/activate/{token}".to_string(),
        ["v1", "users", _] => "/v1/users/{user_id}".to_string(),
        ["v1", "posts", _] => "/v1/posts/{post_id}".to_string(),
        // Unknown paths normalized to "/other" to bound cardinality
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

/// Record a rate limiter decision.
///
/// Metric: `social_rate_limit_decisions_total`
/// Labels: `decision` (allowed, rejected)
pub fn record_rate_limit_decision(decision: &'static str) {
    counter!("social_rate_limit_decisions_total", "decision" => decision).increment(1);
}

/// Record a rejected bearer token.
///
/// Metric: `social_token_validation_failures_total`
/// Labels: `kind` (see `TokenError::kind`)
pub fn record_token_failure(kind: &'static str) {
    counter!("social_token_validation_failures_total", "kind" => kind).increment(1);
}

/// Record an authorization decision.
///
/// Metric: `social_authz_decisions_total`
/// Labels: `outcome` (owner, role, denied, error)
pub fn record_authz_decision(outcome: &'static str) {
    counter!("social_authz_decisions_total", "outcome" => outcome).increment(1);
}

/// Record an identity cache lookup result.
///
/// Metric: `social_identity_cache_total`
/// Labels: `result` (hit, miss, error)
pub fn record_identity_cache(result: &'static str) {
    counter!("social_identity_cache_total", "result" => result).increment(1);
}
