//! HTTP routes for Social API.
//!
//! Defines the Axum router and application state.

use crate::auth::TokenAuthenticator;
use crate::authz::AuthorizationEngine;
use crate::cache::CachedIdentityStore;
use crate::config::Config;
use crate::deadline::Deadline;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, rate_limit, require_basic_auth};
use crate::rate_limiter::RateLimiter;
use crate::repositories::{PostRepository, UserRepository};
use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
///
/// Every component is built once at startup and injected here.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Inbound admission control.
    pub rate_limiter: Arc<dyn RateLimiter>,

    /// Bearer token issue/validate.
    pub authenticator: Arc<TokenAuthenticator>,

    /// Cache-aside identity lookup.
    pub identities: Arc<CachedIdentityStore>,

    /// Ownership and role-precedence decisions.
    pub authorizer: Arc<AuthorizationEngine>,

    /// Persistent identity store (credentials and activation).
    pub users: Arc<dyn UserRepository>,

    /// Post storage.
    pub posts: Arc<dyn PostRepository>,

    /// Process start, reported by the debug endpoint.
    pub started_at: Instant,
}

impl AppState {
    /// Fresh deadline for one request's external calls.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.config.request_timeout)
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/health` - Liveness (public)
/// - `/v1/authentication/token` - Issue a bearer token (public)
/// - `/v1/users/activate/{token}` - Activate an invited user (public)
/// - `/v1/users/{user_id}` - Fetch a user (bearer)
/// - `/v1/posts/{post_id}` - Edit (owner or moderator) / delete (owner or admin)
/// - `/v1/debug/vars` - Runtime variables (basic auth)
/// - `/metrics` - Prometheus scrape, not rate limited
///
/// Every `/v1` route is behind the rate limiter; bearer authentication is
/// done by the `AuthenticatedUser` extractor on the handlers that need it.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.config.request_timeout;

    let api_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/authentication/user", post(handlers::register_user))
        .route("/v1/authentication/token", post(handlers::create_token))
        .route("/v1/users/activate/:token", put(handlers::activate_user))
        .route("/v1/users/:user_id", get(handlers::get_user))
        .route(
            "/v1/posts/:post_id",
            patch(handlers::update_post).delete(handlers::delete_post),
        );

    // Operational routes (basic auth)
    let debug_routes = Router::new()
        .route("/v1/debug/vars", get(handlers::debug_vars))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ));

    let v1_routes = api_routes
        .merge(debug_routes)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    v1_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
