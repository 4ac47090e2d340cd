//! User endpoints.

use crate::auth::invitation_token_hash;
use crate::errors::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::User;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common::types::UserId;
use std::sync::Arc;
use tracing::instrument;

/// Fetch a user by id through the identity cache.
#[instrument(skip_all, name = "social.users.get")]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let user = state.identities.get(UserId(user_id), state.deadline()).await?;
    Ok(Json(user))
}

/// Activate an invited account.
///
/// Invitations store the SHA-256 of the emailed token, never the token
/// itself. The activated user's cached identity is dropped so the next read
/// sees `is_active = true`.
#[instrument(skip_all, name = "social.users.activate")]
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deadline = state.deadline();
    let token_hash = invitation_token_hash(&token);

    let user_id = deadline.run(state.users.activate(&token_hash)).await??;

    state.identities.delete(user_id, deadline).await;

    tracing::info!(target: "social.users", user_id = %user_id, "User activated");
    Ok(StatusCode::NO_CONTENT)
}
