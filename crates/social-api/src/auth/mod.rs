//! Authentication for Social API.
//!
//! - [`jwt`] - HMAC-signed bearer tokens
//! - [`claims`] - token claim types
//! - [`basic`] - HTTP Basic credentials for operational endpoints

pub mod basic;
pub mod claims;
pub mod jwt;

pub use claims::{ClaimSet, Claims};
pub use jwt::{TokenAuthenticator, TokenError};

use crate::cache::CachedIdentityStore;
use crate::deadline::Deadline;
use crate::errors::ApiError;
use crate::models::User;
use crate::observability::metrics;
use crate::repositories::StoreError;
use sha2::{Digest, Sha256};
use tracing::instrument;

/// Hex SHA-256 of an invitation token, the form stored in the database.
pub fn invitation_token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Resolve the identity behind a bearer token.
///
/// Every token failure becomes a generic `Unauthorized`; the specific kind is
/// logged and counted. A subject that no longer exists is also
/// `Unauthorized`, while a store failure is a server error.
#[instrument(skip_all)]
pub async fn authenticate_request(
    authenticator: &TokenAuthenticator,
    identities: &CachedIdentityStore,
    token: &str,
    deadline: Deadline,
) -> Result<User, ApiError> {
    let claims = authenticator.validate_token(token).map_err(|e| {
        metrics::record_token_failure(e.kind());
        tracing::warn!(target: "social.auth", kind = e.kind(), "Bearer token rejected");
        ApiError::Unauthorized(e.to_string())
    })?;

    match identities.get(claims.sub, deadline).await {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound(_)) => {
            tracing::warn!(target: "social.auth", "Token subject no longer exists");
            Err(ApiError::Unauthorized("unknown subject".to_string()))
        }
        Err(other) => Err(other.into()),
    }
}
