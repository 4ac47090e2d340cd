//! Repository layer for Social API.
//!
//! Traits are the seams the request pipeline depends on; the `Pg*` types are
//! the sqlx-backed implementations and [`mock`] holds in-memory ones for
//! tests. All queries use parameterized statements.

pub mod mock;
pub mod posts;
pub mod roles;
pub mod users;

pub use posts::{PgPostRepository, PostRepository};
pub use roles::PgRoleDirectory;
pub use users::{PgUserRepository, UserRepository};

use thiserror::Error;

/// Failure reading or writing the persistent store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Connectivity, timeout or query failure. Retryable.
    #[error("Store unavailable: {0}")]
    Transient(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("record".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(conflict_message(db.constraint()).to_string())
            }
            other => StoreError::Transient(other.to_string()),
        }
    }
}

/// Client-facing message for a unique constraint violation.
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(name) if name.contains("email") => "email already registered",
        Some(name) if name.contains("username") => "username already taken",
        _ => "record already exists",
    }
}
