//! Social API Service Library
//!
//! A small social-network API whose interesting part is the request
//! admission and authorization pipeline in front of every protected action:
//!
//! ```text
//! rate_limiter -> auth (token) -> cache (identity) -> authz -> handler
//! ```
//!
//! # Modules
//!
//! - `rate_limiter` - Per-client fixed-window admission
//! - `auth` - HMAC bearer tokens and basic credentials
//! - `cache` - Cache-aside identity store over pluggable backends
//! - `authz` - Ownership and role-precedence decisions
//! - `repositories` - Postgres stores and in-memory mocks
//! - `deadline` - Request-scoped deadlines for external calls
//! - `middleware` - Axum middleware and extractors
//! - `handlers` - HTTP request handlers
//! - `routes` - Axum router setup and application state
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `observability` - Prometheus metrics

pub mod auth;
pub mod authz;
pub mod cache;
pub mod config;
pub mod deadline;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
