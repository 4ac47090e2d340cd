//! In-memory repositories for tests.
//!
//! Behaviour matches the Postgres implementations closely enough to drive the
//! HTTP pipeline end to end without a database, and every read is counted so
//! tests can assert when the persistent store was (or was not) touched.

use super::{PostRepository, StoreError, UserRepository};
use crate::authz::mock::standard_roles;
use crate::models::{NewUser, Post, User, UserCredentials, USER_ROLE};
use chrono::Utc;
use common::types::{PostId, UserId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

/// Mock identity store.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<UserId, StoredUser>,
    invitations: DashMap<String, UserId>,
    get_by_id_calls: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user. `password_hash` is a bcrypt hash.
    pub fn insert(&self, user: User, password_hash: impl Into<String>) {
        self.users.insert(
            user.id,
            StoredUser {
                user,
                password_hash: password_hash.into(),
            },
        );
    }

    /// Change a stored user in place (e.g. to observe cache staleness).
    pub fn modify(&self, id: UserId, f: impl FnOnce(&mut User)) {
        if let Some(mut stored) = self.users.get_mut(&id) {
            f(&mut stored.user);
        }
    }

    /// Whether an invitation with this token hash is outstanding.
    pub fn has_invitation(&self, token_hash: &str) -> bool {
        self.invitations.contains_key(token_hash)
    }

    /// Register an invitation token hash for `id`.
    pub fn add_invitation(&self, token_hash: impl Into<String>, id: UserId) {
        self.invitations.insert(token_hash.into(), id);
    }

    /// Make every call fail with a transient error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `get_by_id` calls made.
    pub fn get_by_id_calls(&self) -> usize {
        self.get_by_id_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("mock store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        self.users
            .get(&id)
            .map(|stored| stored.user.clone())
            .ok_or_else(|| StoreError::NotFound("user".to_string()))
    }

    async fn get_credentials_by_email(&self, email: &str) -> Result<UserCredentials, StoreError> {
        self.check_available()?;

        self.users
            .iter()
            .find(|stored| stored.user.email == email && stored.user.is_active)
            .map(|stored| UserCredentials {
                user: stored.user.clone(),
                password_hash: stored.password_hash.clone(),
            })
            .ok_or_else(|| StoreError::NotFound("user".to_string()))
    }

    async fn create_and_invite(
        &self,
        new_user: &NewUser,
        token_hash: &str,
        _invitation_ttl: Duration,
    ) -> Result<User, StoreError> {
        self.check_available()?;

        for stored in self.users.iter() {
            if stored.user.email == new_user.email {
                return Err(StoreError::Conflict("email already registered".to_string()));
            }
            if stored.user.username == new_user.username {
                return Err(StoreError::Conflict("username already taken".to_string()));
            }
        }

        let role = standard_roles()
            .into_iter()
            .find(|role| role.name == USER_ROLE)
            .ok_or_else(|| StoreError::Transient("default role is missing".to_string()))?;
        let next_id = self.users.iter().map(|s| s.user.id.0).max().unwrap_or(0) + 1;

        let user = User {
            id: UserId(next_id),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            is_active: false,
            created_at: Utc::now(),
            role,
        };
        self.insert(user.clone(), new_user.password_hash.clone());
        self.add_invitation(token_hash, user.id);
        Ok(user)
    }

    async fn activate(&self, token_hash: &str) -> Result<UserId, StoreError> {
        self.check_available()?;

        let (_, id) = self
            .invitations
            .remove(token_hash)
            .ok_or_else(|| StoreError::NotFound("invitation".to_string()))?;

        self.modify(id, |user| user.is_active = true);
        self.invitations.retain(|_, invited| *invited != id);
        Ok(id)
    }
}

/// Mock post store.
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: DashMap<PostId, Post>,
    failing: AtomicBool,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    /// Current stored copy of a post.
    pub fn get(&self, id: PostId) -> Option<Post> {
        self.posts.get(&id).map(|p| p.clone())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("mock store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn get_by_id(&self, id: PostId) -> Result<Post, StoreError> {
        self.check_available()?;
        self.get(id)
            .ok_or_else(|| StoreError::NotFound("post".to_string()))
    }

    async fn update(&self, post: &Post) -> Result<Post, StoreError> {
        self.check_available()?;

        let mut stored = self
            .posts
            .get_mut(&post.id)
            .filter(|stored| stored.version == post.version)
            .ok_or_else(|| StoreError::NotFound("post".to_string()))?;

        *stored = Post {
            version: post.version + 1,
            updated_at: Utc::now(),
            ..post.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: PostId) -> Result<(), StoreError> {
        self.check_available()?;
        self.posts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("post".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_invite_then_activate() {
        let repo = InMemoryUserRepository::new();

        let user = repo
            .create_and_invite(&new_user("ana", "ana@example.com"), "h1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!user.is_active);
        assert_eq!(user.role.name, USER_ROLE);
        assert!(repo.has_invitation("h1"));

        let activated = repo.activate("h1").await.unwrap();
        assert_eq!(activated, user.id);
        assert!(repo.get_by_id(user.id).await.unwrap().is_active);
        assert!(!repo.has_invitation("h1"));
    }

    #[tokio::test]
    async fn test_create_and_invite_rejects_duplicates() {
        let repo = InMemoryUserRepository::new();
        let ttl = Duration::from_secs(60);
        repo.create_and_invite(&new_user("ana", "ana@example.com"), "h1", ttl)
            .await
            .unwrap();

        let same_email = repo
            .create_and_invite(&new_user("other", "ana@example.com"), "h2", ttl)
            .await;
        assert!(matches!(same_email, Err(StoreError::Conflict(_))));

        let same_name = repo
            .create_and_invite(&new_user("ana", "other@example.com"), "h3", ttl)
            .await;
        assert!(matches!(same_name, Err(StoreError::Conflict(_))));
        assert!(!repo.has_invitation("h2"));
    }
}
