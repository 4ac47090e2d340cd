//! Registration (`POST /v1/authentication/user`) and token issuance
//! (`POST /v1/authentication/token`).

use crate::auth::{invitation_token_hash, ClaimSet};
use crate::errors::ApiError;
use crate::models::{
    NewUser, RegisterUserRequest, RegistrationResponse, TokenRequest, TokenResponse,
};
use crate::repositories::StoreError;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Register an inactive account and issue its activation token.
///
/// The plain token is returned once in the response; only its hash is
/// stored. Delivering it to the user is left to the caller.
#[instrument(skip_all, name = "social.auth.register_user")]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    request.validate().map_err(ApiError::BadRequest)?;

    let cost = state.config.bcrypt_cost;
    let password = request.password;
    let password_hash =
        tokio::task::spawn_blocking(move || bcrypt::hash(password.expose_secret(), cost))
            .await
            .map_err(|e| {
                tracing::error!(target: "social.auth", error = %e, "Password hashing task failed");
                ApiError::Internal
            })?
            .map_err(|e| {
                tracing::error!(target: "social.auth", error = %e, "Password hashing failed");
                ApiError::Internal
            })?;

    let new_user = NewUser {
        username: request.username.trim().to_string(),
        email: request.email.trim().to_string(),
        password_hash,
    };
    let token = uuid::Uuid::new_v4().to_string();

    let user = state
        .deadline()
        .run(state.users.create_and_invite(
            &new_user,
            &invitation_token_hash(&token),
            state.config.invitation_ttl,
        ))
        .await??;

    tracing::info!(target: "social.auth", user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse { user, token }),
    ))
}

/// Exchange email and password for a bearer token.
///
/// Unknown email, inactive account and wrong password all produce the same
/// generic 401 so the response does not reveal which accounts exist.
#[instrument(skip_all, name = "social.auth.create_token")]
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let deadline = state.deadline();

    let credentials = match deadline
        .run(state.users.get_credentials_by_email(&request.email))
        .await?
    {
        Ok(credentials) => credentials,
        Err(StoreError::NotFound(_)) => {
            tracing::info!(target: "social.auth", "Token requested for unknown or inactive account");
            return Err(ApiError::Unauthorized("invalid credentials".to_string()));
        }
        Err(other) => return Err(other.into()),
    };

    // bcrypt is CPU-bound; keep it off the async workers.
    let password = request.password;
    let hash = credentials.password_hash;
    let matches = tokio::task::spawn_blocking(move || {
        bcrypt::verify(password.expose_secret(), &hash)
    })
    .await
    .map_err(|e| {
        tracing::error!(target: "social.auth", error = %e, "Password verification task failed");
        ApiError::Internal
    })?
    .map_err(|e| {
        tracing::error!(target: "social.auth", error = %e, "Stored password hash is unusable");
        ApiError::Internal
    })?;

    if !matches {
        tracing::info!(
            target: "social.auth",
            user_id = %credentials.user.id,
            "Password mismatch"
        );
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let access_token = state
        .authenticator
        .generate_token(ClaimSet::for_subject(credentials.user.id))
        .map_err(|e| {
            tracing::error!(target: "social.auth", error = %e, "Token signing failed");
            ApiError::Internal
        })?;

    tracing::info!(target: "social.auth", user_id = %credentials.user.id, "Token issued");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.authenticator.ttl().as_secs(),
        }),
    ))
}
