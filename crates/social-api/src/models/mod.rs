//! Social API models.
//!
//! Contains data types used across the Social API service.

use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use common::types::{PostId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to newly registered users.
pub const USER_ROLE: &str = "user";

/// Role name required to edit another user's post.
pub const MODERATOR_ROLE: &str = "moderator";

/// Role name required to delete another user's post.
pub const ADMIN_ROLE: &str = "admin";

/// Maximum post title length.
pub const MAX_POST_TITLE_LENGTH: usize = 100;

/// Maximum post content length.
pub const MAX_POST_CONTENT_LENGTH: usize = 1000;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 100;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 255;

/// Minimum password length at registration.
pub const MIN_PASSWORD_LENGTH: usize = 3;

/// bcrypt only hashes the first 72 bytes; longer passwords are rejected.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Named privilege tier.
///
/// Roles are totally ordered by `level`; a higher level subsumes every
/// privilege of a lower one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub level: i32,
    pub description: String,
}

/// Authenticated principal as stored in the persistent identity store.
///
/// This is also the value cached by the identity store, JSON-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub role: Role,
}

/// A user together with the stored password hash.
///
/// Only used while issuing tokens; never cached or serialized.
#[derive(Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("user", &self.user)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Identity to be created by registration, password already hashed.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Request body for `POST /v1/authentication/user`.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

impl RegisterUserRequest {
    /// Check field presence and lengths.
    pub fn validate(&self) -> Result<(), String> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err("username is required".to_string());
        }
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(format!(
                "username must be at most {} characters",
                MAX_USERNAME_LENGTH
            ));
        }

        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err("a valid email is required".to_string());
        }
        if email.len() > MAX_EMAIL_LENGTH {
            return Err(format!("email must be at most {} characters", MAX_EMAIL_LENGTH));
        }

        let password = self.password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(format!("password must be at most {} bytes", MAX_PASSWORD_BYTES));
        }

        Ok(())
    }
}

/// Registration result: the inactive user and the plain activation token.
///
/// Only the token's hash is stored; this response is the one place the token
/// itself appears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

/// A post, the owned resource gated by the authorization engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Health check response.
///
/// Returned by the `/v1/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub env: String,
    pub version: String,
}

/// Request body for `POST /v1/authentication/token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: SecretString,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Request body for `PATCH /v1/posts/{post_id}`.
///
/// Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdatePostRequest {
    /// Check field constraints, returning a client-facing reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.is_none() && self.content.is_none() && self.tags.is_none() {
            return Err("at least one of title, content or tags must be provided".to_string());
        }

        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err("title must not be empty".to_string());
            }
            if title.chars().count() > MAX_POST_TITLE_LENGTH {
                return Err(format!(
                    "title must be at most {} characters",
                    MAX_POST_TITLE_LENGTH
                ));
            }
        }

        if let Some(content) = &self.content {
            if content.trim().is_empty() {
                return Err("content must not be empty".to_string());
            }
            if content.chars().count() > MAX_POST_CONTENT_LENGTH {
                return Err(format!(
                    "content must be at most {} characters",
                    MAX_POST_CONTENT_LENGTH
                ));
            }
        }

        Ok(())
    }

    /// Apply the provided fields to `post`.
    pub fn apply_to(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
    }
}
