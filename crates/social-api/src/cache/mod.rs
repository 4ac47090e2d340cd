//! Identity caching.
//!
//! [`CacheBackend`] is a byte-oriented key/value store with per-entry TTL.
//! Two backends exist: [`RedisCache`] for shared deployments and
//! [`InMemoryCache`] when Redis is disabled. Cache failures never surface
//! to callers of [`CachedIdentityStore`]; they are logged and treated as a
//! miss.

pub mod identity;
pub mod memory;
pub mod redis_backend;

pub use identity::CachedIdentityStore;
pub use memory::InMemoryCache;
pub use redis_backend::RedisCache;

use std::time::Duration;
use thiserror::Error;

/// Cache backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache command failed: {0}")]
    Command(String),
}

/// Key/value store with expiring entries.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Mock cache backends for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that is always unreachable.
    #[derive(Default)]
    pub struct UnavailableCache {
        call_count: AtomicUsize,
    }

    impl UnavailableCache {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn fail(&self) -> CacheError {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            CacheError::Connection("mock cache unavailable".to_string())
        }
    }

    #[async_trait::async_trait]
    impl CacheBackend for UnavailableCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(self.fail())
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
            Err(self.fail())
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(self.fail())
        }
    }

    /// Backend whose calls never complete (until the caller's deadline).
    #[derive(Default)]
    pub struct HangingCache;

    #[async_trait::async_trait]
    impl CacheBackend for HangingCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            std::future::pending().await
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            std::future::pending().await
        }
    }
}
