//! Social API error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use crate::authz::AuthzError;
use crate::deadline::DeadlineExceeded;
use crate::repositories::StoreError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Challenge sent with bearer-token 401 responses.
pub const BEARER_CHALLENGE: &str = "Bearer realm=\"social-api\", error=\"invalid_token\"";

/// Challenge sent with basic-auth 401 responses.
pub const BASIC_CHALLENGE: &str = "Basic realm=\"restricted\", charset=\"UTF-8\"";

/// Social API error type.
///
/// Maps to appropriate HTTP status codes:
/// - Unauthorized, BasicUnauthorized: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - RateLimitExceeded: 429 Too Many Requests
/// - BadRequest: 400 Bad Request
/// - RoleLookup, Database, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bearer authentication failed. The reason is logged, never returned.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Basic authentication failed on an operational endpoint.
    #[error("Basic authentication failed: {0}")]
    BasicUnauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Duration },

    #[error("Not found: {0}")]
    NotFound(String),

    /// A required role is not defined in the role directory.
    #[error("Role lookup failed: {0}")]
    RoleLookup(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Unauthorized(_) | ApiError::BasicUnauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::RateLimitExceeded { .. } => 429,
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::RoleLookup(_) | ApiError::Database(_) | ApiError::Internal => 500,
        }
    }
}

/// Whole seconds for a `Retry-After` header, rounded up.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized(reason) => {
                tracing::debug!(target: "social.auth", reason = %reason, "Request unauthorized");
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "The access token is missing, invalid or expired".to_string(),
                )
            }
            ApiError::BasicUnauthorized(reason) => {
                tracing::debug!(target: "social.auth.basic", reason = %reason, "Basic authentication failed");
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Authentication required".to_string(),
                )
            }
            ApiError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            ApiError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Too many requests. Please try again later.".to_string(),
            ),
            ApiError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            ApiError::RoleLookup(role) => {
                tracing::error!(target: "social.authz", role = %role, "Required role missing from role directory");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    "The server is misconfigured".to_string(),
                )
            }
            ApiError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "social.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        let challenge = match &self {
            ApiError::Unauthorized(_) => Some(BEARER_CHALLENGE),
            ApiError::BasicUnauthorized(_) => Some(BASIC_CHALLENGE),
            _ => None,
        };
        if let Some(challenge) = challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(challenge),
            );
        }

        if let ApiError::RateLimitExceeded { retry_after } = &self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(*retry_after)),
            );
        }

        response
    }
}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<DeadlineExceeded> for ApiError {
    fn from(_: DeadlineExceeded) -> Self {
        ApiError::Database("deadline exceeded".to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(resource) => ApiError::NotFound(resource),
            StoreError::Conflict(reason) => ApiError::BadRequest(reason),
            StoreError::Transient(reason) => ApiError::Database(reason),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Lookup(role) => ApiError::RoleLookup(role),
            AuthzError::Directory(reason) => ApiError::Database(reason),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_unauthorized() {
        let error = ApiError::Unauthorized("token expired".to_string());
        assert_eq!(format!("{}", error), "Unauthorized: token expired");
    }

    #[test]
    fn test_display_rate_limit() {
        let error = ApiError::RateLimitExceeded {
            retry_after: Duration::from_secs(3),
        };
        assert_eq!(format!("{}", error), "Rate limit exceeded");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthorized("t".to_string()).status_code(), 401);
        assert_eq!(ApiError::BasicUnauthorized("t".to_string()).status_code(), 401);
        assert_eq!(ApiError::Forbidden("t".to_string()).status_code(), 403);
        assert_eq!(
            ApiError::RateLimitExceeded {
                retry_after: Duration::from_secs(1)
            }
            .status_code(),
            429
        );
        assert_eq!(ApiError::NotFound("t".to_string()).status_code(), 404);
        assert_eq!(ApiError::RoleLookup("t".to_string()).status_code(), 500);
        assert_eq!(ApiError::Database("t".to_string()).status_code(), 500);
        assert_eq!(ApiError::BadRequest("t".to_string()).status_code(), 400);
        assert_eq!(ApiError::Internal.status_code(), 500);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(4_300)), 5);
        assert_eq!(retry_after_secs(Duration::from_secs(5)), 5);
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
    }

    #[tokio::test]
    async fn test_into_response_unauthorized_is_generic() {
        let error = ApiError::Unauthorized("signature mismatch".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.starts_with("Bearer realm=\"social-api\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "UNAUTHORIZED");
        assert!(!body_json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("signature"));
    }

    #[tokio::test]
    async fn test_into_response_basic_unauthorized() {
        let response = ApiError::BasicUnauthorized("bad password".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            BASIC_CHALLENGE
        );
    }

    #[tokio::test]
    async fn test_into_response_rate_limit_sets_retry_after() {
        let error = ApiError::RateLimitExceeded {
            retry_after: Duration::from_millis(2_500),
        };
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "3");

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "RATE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn test_into_response_role_lookup() {
        let response = ApiError::RoleLookup("moderator".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_into_response_database_error() {
        let error = ApiError::Database("connection failed".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "DATABASE_ERROR");
        assert_eq!(
            body_json["error"]["message"],
            "An internal database error occurred"
        );
    }

    #[tokio::test]
    async fn test_into_response_forbidden() {
        let response = ApiError::Forbidden("Access denied".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "FORBIDDEN");
        assert_eq!(body_json["error"]["message"], "Access denied");
    }

    #[test]
    fn test_from_store_error() {
        let not_found: ApiError = StoreError::NotFound("user".to_string()).into();
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let transient: ApiError = StoreError::Transient("timeout".to_string()).into();
        assert!(matches!(transient, ApiError::Database(_)));

        let conflict: ApiError = StoreError::Conflict("email already registered".to_string()).into();
        assert!(matches!(conflict, ApiError::BadRequest(ref m) if m == "email already registered"));
    }

    #[test]
    fn test_from_authz_error() {
        let lookup: ApiError = AuthzError::Lookup("admin".to_string()).into();
        assert!(matches!(lookup, ApiError::RoleLookup(ref r) if r == "admin"));

        let directory: ApiError = AuthzError::Directory("down".to_string()).into();
        assert!(matches!(directory, ApiError::Database(_)));
    }
}
