//! Common configuration types for Social API components.
//!
//! These are plain values built once at startup and injected into the
//! components that need them. Secrets are wrapped in [`SecretString`] so
//! derived `Debug` output is redacted.

use crate::secret::SecretString;
use std::time::Duration;

/// Fixed-window rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// When false every request is admitted
    pub enabled: bool,
    /// Maximum admitted requests per key per window
    pub requests_per_window: u32,
    /// Window length
    pub window: Duration,
}

/// Signed bearer token configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC-SHA256 signing secret
    pub secret: SecretString,
    /// Expected and default `iss` claim
    pub issuer: String,
    /// Expected and default `aud` claim
    pub audience: String,
    /// Default lifetime used when a claim set has no `exp`
    pub ttl: Duration,
}

/// HTTP Basic credentials guarding operational endpoints
#[derive(Debug, Clone)]
pub struct BasicAuthConfig {
    /// Expected username
    pub username: String,
    /// Expected password
    pub password: SecretString,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Use Redis as the identity cache backend
    pub enabled: bool,
    /// Redis connection URL (may embed credentials)
    pub url: SecretString,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_config_debug_redacts_secret() {
        let config = TokenConfig {
            secret: SecretString::from("super-secret-signing-key"),
            issuer: "social-api".to_string(),
            audience: "social-api".to_string(),
            ttl: Duration::from_secs(60),
        };

        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-signing-key"));
        assert!(debug.contains("social-api"));
    }

    #[test]
    fn test_redis_config_debug_redacts_url() {
        let config = RedisConfig {
            enabled: true,
            url: SecretString::from("redis://:hunter2@cache:6379"),
        };

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
    }
}
