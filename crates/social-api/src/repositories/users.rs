//! Persistent identity store.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Password hashes never leave this module except inside `UserCredentials`
//! - Invitation tokens are stored and looked up by SHA-256 hash only

use crate::models::{NewUser, Role, User, UserCredentials, USER_ROLE};
use crate::repositories::StoreError;
use chrono::{DateTime, Utc};
use common::types::UserId;
use sqlx::PgPool;
use std::time::Duration;
use tracing::instrument;

const USER_COLUMNS: &str = r#"
    u.id,
    u.username,
    u.email,
    u.is_active,
    u.created_at,
    r.id AS role_id,
    r.name AS role_name,
    r.level AS role_level,
    r.description AS role_description
"#;

/// Registration, read and activation access to identity records.
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch an identity with its role.
    async fn get_by_id(&self, id: UserId) -> Result<User, StoreError>;

    /// Fetch an active identity and its password hash by email.
    async fn get_credentials_by_email(&self, email: &str) -> Result<UserCredentials, StoreError>;

    /// Create an inactive user with the default role plus its invitation.
    ///
    /// Both rows are written in one transaction. A duplicate email or
    /// username is a [`StoreError::Conflict`].
    async fn create_and_invite(
        &self,
        new_user: &NewUser,
        token_hash: &str,
        invitation_ttl: Duration,
    ) -> Result<User, StoreError>;

    /// Consume an unexpired invitation and activate its user.
    ///
    /// `token_hash` is the hex SHA-256 of the token the user received.
    async fn activate(&self, token_hash: &str) -> Result<UserId, StoreError>;
}

/// Postgres-backed [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip_all, fields(user_id = %id))]
    async fn get_by_id(&self, id: UserId) -> Result<User, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        );

        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Transient(format!("Failed to fetch user by id: {}", e)))?;

        row.map(User::from)
            .ok_or_else(|| StoreError::NotFound("user".to_string()))
    }

    #[instrument(skip_all)]
    async fn get_credentials_by_email(&self, email: &str) -> Result<UserCredentials, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS}, u.password FROM users u JOIN roles r ON r.id = u.role_id \
             WHERE u.email = $1 AND u.is_active = TRUE"
        );

        let row: Option<CredentialsRow> = sqlx::query_as(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                StoreError::Transient(format!("Failed to fetch credentials by email: {}", e))
            })?;

        row.map(|r| UserCredentials {
            user: User::from(r.user),
            password_hash: r.password,
        })
        .ok_or_else(|| StoreError::NotFound("user".to_string()))
    }

    #[instrument(skip_all)]
    async fn create_and_invite(
        &self,
        new_user: &NewUser,
        token_hash: &str,
        invitation_ttl: Duration,
    ) -> Result<User, StoreError> {
        let ttl_seconds = i64::try_from(invitation_ttl.as_secs()).unwrap_or(i64::MAX);
        let mut tx = self.pool.begin().await?;

        let user_id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password, is_active, role_id)
            SELECT $1, $2, $3, FALSE, id FROM roles WHERE name = $4
            RETURNING id
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(USER_ROLE)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Err(StoreError::Transient(format!(
                "default role '{}' is missing",
                USER_ROLE
            )));
        };

        sqlx::query(
            r#"
            INSERT INTO user_invitations (token, user_id, expiry)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
            "#,
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(ttl_seconds)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        );
        let row: UserRow = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(target: "social.repository.users", user_id, "User registered");
        Ok(User::from(row))
    }

    #[instrument(skip_all)]
    async fn activate(&self, token_hash: &str) -> Result<UserId, StoreError> {
        let mut tx = self.pool.begin().await?;

        let user_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM user_invitations
            WHERE token = $1 AND expiry > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Err(StoreError::NotFound("invitation".to_string()));
        };

        sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(target: "social.repository.users", user_id, "User activated");
        Ok(UserId(user_id))
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    role_id: i64,
    role_name: String,
    role_level: i32,
    role_description: String,
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            username: row.username,
            email: row.email,
            is_active: row.is_active,
            created_at: row.created_at,
            role: Role {
                id: row.role_id,
                name: row.role_name,
                level: row.role_level,
                description: row.role_description,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_row_conversion_nests_role() {
        let row = UserRow {
            id: 7,
            username: "mod".to_string(),
            email: "mod@example.com".to_string(),
            is_active: true,
            created_at: Utc::now(),
            role_id: 2,
            role_name: "moderator".to_string(),
            role_level: 2,
            role_description: "Can edit posts".to_string(),
        };

        let user = User::from(row);
        assert_eq!(user.id, UserId(7));
        assert_eq!(user.role.name, "moderator");
        assert_eq!(user.role.level, 2);
    }
}
