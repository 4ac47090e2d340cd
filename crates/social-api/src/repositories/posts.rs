//! Post storage.
//!
//! Updates use optimistic concurrency on the `version` column: an update
//! carrying a stale version matches no row and is reported as not found.

use crate::models::Post;
use crate::repositories::StoreError;
use chrono::{DateTime, Utc};
use common::types::{PostId, UserId};
use sqlx::PgPool;
use tracing::instrument;

/// Post persistence.
#[async_trait::async_trait]
pub trait PostRepository: Send + Sync {
    async fn get_by_id(&self, id: PostId) -> Result<Post, StoreError>;

    /// Persist `post`'s title, content and tags if its version is current.
    /// Returns the post with the bumped version and new `updated_at`.
    async fn update(&self, post: &Post) -> Result<Post, StoreError>;

    async fn delete(&self, id: PostId) -> Result<(), StoreError>;
}

/// Postgres-backed [`PostRepository`].
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PostRepository for PgPostRepository {
    #[instrument(skip_all, fields(post_id = %id))]
    async fn get_by_id(&self, id: PostId) -> Result<Post, StoreError> {
        let row: Option<PostRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, title, content, tags, version, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(format!("Failed to fetch post: {}", e)))?;

        row.map(Post::from)
            .ok_or_else(|| StoreError::NotFound("post".to_string()))
    }

    #[instrument(skip_all, fields(post_id = %post.id, version = post.version))]
    async fn update(&self, post: &Post) -> Result<Post, StoreError> {
        let row: Option<VersionRow> = sqlx::query_as(
            r#"
            UPDATE posts
            SET title = $1, content = $2, tags = $3, version = version + 1, updated_at = NOW()
            WHERE id = $4 AND version = $5
            RETURNING version, updated_at
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.tags)
        .bind(post.id.0)
        .bind(post.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(format!("Failed to update post: {}", e)))?;

        let row = row.ok_or_else(|| StoreError::NotFound("post".to_string()))?;

        Ok(Post {
            version: row.version,
            updated_at: row.updated_at,
            ..post.clone()
        })
    }

    #[instrument(skip_all, fields(post_id = %id))]
    async fn delete(&self, id: PostId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Transient(format!("Failed to delete post: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("post".to_string()));
        }

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    user_id: i64,
    title: String,
    content: String,
    tags: Vec<String>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct VersionRow {
    version: i32,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: PostId(row.id),
            user_id: UserId(row.user_id),
            title: row.title,
            content: row.content,
            tags: row.tags,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
