//! Middleware for Social API.
//!
//! # Components
//!
//! - `rate_limit` - Per-client fixed-window admission (outermost on `/v1`)
//! - `auth` - `AuthenticatedUser` extractor and basic-auth middleware
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;
pub mod rate_limit;

pub use auth::{require_basic_auth, AuthenticatedUser};
pub use http_metrics::http_metrics_middleware;
pub use rate_limit::{client_key, rate_limit};
