//! Post endpoints guarded by the authorization engine.
//!
//! - `PATCH` requires ownership or at least `moderator`
//! - `DELETE` requires ownership or at least `admin`

use crate::authz::require_access;
use crate::errors::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{Post, UpdatePostRequest, ADMIN_ROLE, MODERATOR_ROLE};
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common::types::PostId;
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip_all, name = "social.posts.update")]
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(post_id): Path<i64>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    request.validate().map_err(ApiError::BadRequest)?;

    let deadline = state.deadline();
    let mut post = deadline.run(state.posts.get_by_id(PostId(post_id))).await??;

    require_access(&state.authorizer, &caller, post.user_id, MODERATOR_ROLE, deadline).await?;

    request.apply_to(&mut post);
    let updated = deadline.run(state.posts.update(&post)).await??;

    tracing::info!(target: "social.posts", post_id = %updated.id, user_id = %caller.id, "Post updated");
    Ok(Json(updated))
}

#[instrument(skip_all, name = "social.posts.delete")]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let deadline = state.deadline();
    let post = deadline.run(state.posts.get_by_id(PostId(post_id))).await??;

    require_access(&state.authorizer, &caller, post.user_id, ADMIN_ROLE, deadline).await?;

    deadline.run(state.posts.delete(post.id)).await??;

    tracing::info!(target: "social.posts", post_id = %post.id, user_id = %caller.id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}
