//! Role directory backed by the `roles` table.

use crate::authz::RoleDirectory;
use crate::models::Role;
use crate::repositories::StoreError;
use sqlx::PgPool;
use tracing::instrument;

/// Postgres-backed [`RoleDirectory`].
#[derive(Clone)]
pub struct PgRoleDirectory {
    pool: PgPool,
}

impl PgRoleDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RoleDirectory for PgRoleDirectory {
    #[instrument(skip_all, fields(role = %name))]
    async fn get_by_name(&self, name: &str) -> Result<Role, StoreError> {
        let row: Option<RoleRow> = sqlx::query_as(
            r#"
            SELECT id, name, level, description
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(format!("Failed to fetch role: {}", e)))?;

        row.map(|r| Role {
            id: r.id,
            name: r.name,
            level: r.level,
            description: r.description,
        })
        .ok_or_else(|| StoreError::NotFound(format!("role '{}'", name)))
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    level: i32,
    description: String,
}
