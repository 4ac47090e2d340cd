//! Authentication at the HTTP boundary.
//!
//! - [`AuthenticatedUser`] - extractor that validates the bearer token and
//!   resolves the caller's identity, handing the `User` to the handler as a
//!   plain argument
//! - [`require_basic_auth`] - middleware guarding operational endpoints

use crate::auth::authenticate_request;
use crate::auth::basic::verify_basic_credentials;
use crate::errors::ApiError;
use crate::models::User;
use crate::routes::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Extract the Bearer token from the Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "social.middleware.auth", "Missing Authorization header");
            ApiError::Unauthorized("Missing Authorization header".to_string())
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "social.middleware.auth", "Invalid Authorization header format");
        ApiError::Unauthorized("Invalid Authorization header format".to_string())
    })
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    #[instrument(skip_all, name = "social.middleware.auth")]
    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;

        let user = authenticate_request(
            &state.authenticator,
            &state.identities,
            token,
            state.deadline(),
        )
        .await?;

        Ok(AuthenticatedUser(user))
    }
}

/// Basic-auth middleware for operational endpoints.
///
/// Returns 401 with a `WWW-Authenticate: Basic` challenge on failure.
#[instrument(skip_all, name = "social.middleware.basic_auth")]
pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    verify_basic_credentials(header, &state.config.basic_auth)
        .map_err(|e| ApiError::BasicUnauthorized(e.to_string()))?;

    Ok(next.run(req).await)
}
