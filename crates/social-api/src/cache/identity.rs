//! Cache-aside identity store.
//!
//! Reads go to the cache first; a miss (absent, expired, unreachable or
//! undecodable entry) falls through to the persistent store, and the result
//! is written back with a fixed TTL. Only persistent-store errors reach the
//! caller. `NotFound` is never cached.
//!
//! Concurrent cold misses for the same id may each read the store and fill
//! the cache; the last write wins. Cached records can lag the store by up to
//! one TTL unless [`CachedIdentityStore::delete`] is called on mutation.

use super::CacheBackend;
use crate::deadline::Deadline;
use crate::models::User;
use crate::observability::metrics;
use crate::repositories::{StoreError, UserRepository};
use common::types::UserId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

/// Default lifetime of a cached identity.
pub const DEFAULT_IDENTITY_TTL: Duration = Duration::from_secs(60);

/// Upper bound on a single cache call, so a hung cache cannot consume the
/// whole request deadline.
pub const DEFAULT_CACHE_OP_TIMEOUT: Duration = Duration::from_millis(250);

/// Cache key for an identity record.
pub fn cache_key(id: UserId) -> String {
    format!("user-{}", id)
}

/// Read-through identity lookup.
pub struct CachedIdentityStore {
    cache: Arc<dyn CacheBackend>,
    store: Arc<dyn UserRepository>,
    ttl: Duration,
    cache_timeout: Duration,
}

impl CachedIdentityStore {
    pub fn new(cache: Arc<dyn CacheBackend>, store: Arc<dyn UserRepository>, ttl: Duration) -> Self {
        Self {
            cache,
            store,
            ttl,
            cache_timeout: DEFAULT_CACHE_OP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_cache_timeout(mut self, cache_timeout: Duration) -> Self {
        self.cache_timeout = cache_timeout;
        self
    }

    /// Resolve an identity, preferring the cache.
    ///
    /// # Errors
    ///
    /// - `NotFound` - the store has no such identity
    /// - `Transient` - the store failed or the deadline expired
    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn get(&self, id: UserId, deadline: Deadline) -> Result<User, StoreError> {
        let key = cache_key(id);

        if let Some(user) = self.read_cached(&key, deadline).await {
            metrics::record_identity_cache("hit");
            return Ok(user);
        }
        metrics::record_identity_cache("miss");

        let user = deadline
            .run(self.store.get_by_id(id))
            .await
            .map_err(|_| StoreError::Transient("deadline exceeded reading identity".to_string()))??;

        self.write_cached(&key, &user, deadline).await;
        Ok(user)
    }

    /// Drop the cached entry for `id`. Idempotent; cache errors are logged
    /// and swallowed.
    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn delete(&self, id: UserId, deadline: Deadline) {
        let key = cache_key(id);

        match deadline.capped(self.cache_timeout).run(self.cache.delete(&key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                metrics::record_identity_cache("error");
                warn!(target: "social.cache", error = %e, "Failed to delete cached identity");
            }
            Err(_) => {
                metrics::record_identity_cache("error");
                warn!(target: "social.cache", "Timed out deleting cached identity");
            }
        }
    }

    async fn read_cached(&self, key: &str, deadline: Deadline) -> Option<User> {
        let bytes = match deadline.capped(self.cache_timeout).run(self.cache.get(key)).await {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                metrics::record_identity_cache("error");
                warn!(target: "social.cache", error = %e, "Identity cache read failed");
                return None;
            }
            Err(_) => {
                metrics::record_identity_cache("error");
                warn!(target: "social.cache", "Identity cache read timed out");
                return None;
            }
        };

        match serde_json::from_slice::<User>(&bytes) {
            Ok(user) => Some(user),
            Err(e) => {
                metrics::record_identity_cache("error");
                warn!(target: "social.cache", error = %e, "Cached identity could not be decoded");
                None
            }
        }
    }

    async fn write_cached(&self, key: &str, user: &User, deadline: Deadline) {
        let bytes = match serde_json::to_vec(user) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(target: "social.cache", error = %e, "Failed to encode identity for cache");
                return;
            }
        };

        match deadline
            .capped(self.cache_timeout)
            .run(self.cache.set(key, &bytes, self.ttl))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                metrics::record_identity_cache("error");
                warn!(target: "social.cache", error = %e, "Identity cache write failed");
            }
            Err(_) => {
                metrics::record_identity_cache("error");
                warn!(target: "social.cache", "Identity cache write timed out");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::authz::mock::standard_roles;
    use crate::cache::mock::{HangingCache, UnavailableCache};
    use crate::cache::InMemoryCache;
    use crate::repositories::mock::InMemoryUserRepository;
    use chrono::Utc;

    fn sample_user(id: i64) -> User {
        let role = standard_roles().into_iter().next().unwrap();
        User {
            id: UserId(id),
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            is_active: true,
            created_at: Utc::now(),
            role,
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    struct Fixture {
        cache: Arc<InMemoryCache>,
        repo: Arc<InMemoryUserRepository>,
        store: CachedIdentityStore,
    }

    fn fixture() -> Fixture {
        let cache = Arc::new(InMemoryCache::new());
        let repo = Arc::new(InMemoryUserRepository::new());
        repo.insert(sample_user(1), "hash");
        let store = CachedIdentityStore::new(
            Arc::clone(&cache) as Arc<dyn CacheBackend>,
            Arc::clone(&repo) as Arc<dyn UserRepository>,
            DEFAULT_IDENTITY_TTL,
        );
        Fixture { cache, repo, store }
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key(UserId(42)), "user-42");
    }

    #[tokio::test]
    async fn test_cold_miss_reads_store_then_hits_cache() {
        let f = fixture();

        let first = f.store.get(UserId(1), deadline()).await.unwrap();
        assert_eq!(f.repo.get_by_id_calls(), 1);
        assert!(f.cache.contains_key("user-1"));

        let second = f.store.get(UserId(1), deadline()).await.unwrap();
        assert_eq!(f.repo.get_by_id_calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_delete_forces_store_read() {
        let f = fixture();

        f.store.get(UserId(1), deadline()).await.unwrap();
        f.store.delete(UserId(1), deadline()).await;
        f.store.delete(UserId(1), deadline()).await;

        f.store.get(UserId(1), deadline()).await.unwrap();
        assert_eq!(f.repo.get_by_id_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_until_ttl_then_refreshed() {
        let f = fixture();

        f.store.get(UserId(1), deadline()).await.unwrap();
        f.repo.modify(UserId(1), |u| u.username = "renamed".to_string());

        let cached = f.store.get(UserId(1), deadline()).await.unwrap();
        assert_eq!(cached.username, "user1");

        tokio::time::advance(DEFAULT_IDENTITY_TTL).await;

        let fresh = f.store.get(UserId(1), deadline()).await.unwrap();
        assert_eq!(fresh.username, "renamed");
        assert_eq!(f.repo.get_by_id_calls(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_propagated_and_not_cached() {
        let f = fixture();

        let result = f.store.get(UserId(99), deadline()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(!f.cache.contains_key("user-99"));
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        let f = fixture();
        f.repo.set_failing(true);

        let result = f.store.get(UserId(1), deadline()).await;
        assert!(matches!(result, Err(StoreError::Transient(_))));
    }

    #[tokio::test]
    async fn test_unavailable_cache_falls_through_to_store() {
        let repo = Arc::new(InMemoryUserRepository::new());
        repo.insert(sample_user(1), "hash");
        let cache = Arc::new(UnavailableCache::new());
        let store = CachedIdentityStore::new(
            Arc::clone(&cache) as Arc<dyn CacheBackend>,
            Arc::clone(&repo) as Arc<dyn UserRepository>,
            DEFAULT_IDENTITY_TTL,
        );

        let user = store.get(UserId(1), deadline()).await.unwrap();
        assert_eq!(user.id, UserId(1));
        // read + write attempted
        assert_eq!(cache.call_count(), 2);

        store.delete(UserId(1), deadline()).await;
        assert_eq!(cache.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_cache_does_not_consume_deadline() {
        let repo = Arc::new(InMemoryUserRepository::new());
        repo.insert(sample_user(1), "hash");
        let store = CachedIdentityStore::new(
            Arc::new(HangingCache),
            Arc::clone(&repo) as Arc<dyn UserRepository>,
            DEFAULT_IDENTITY_TTL,
        );

        let user = store
            .get(UserId(1), Deadline::after(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(user.id, UserId(1));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let f = fixture();
        f.cache
            .set("user-1", b"not json", Duration::from_secs(60))
            .await
            .unwrap();

        let user = f.store.get(UserId(1), deadline()).await.unwrap();
        assert_eq!(user.username, "user1");
        assert_eq!(f.repo.get_by_id_calls(), 1);
    }
}
