//! Shared harness for HTTP-level tests.
//!
//! Builds the real router over in-memory repositories, an in-process cache
//! and a static role directory, so every request runs the full pipeline
//! without Postgres or Redis.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use common::types::{PostId, UserId};
use http_body_util::BodyExt;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use social_api::auth::{ClaimSet, TokenAuthenticator};
use social_api::authz::mock::{standard_roles, StaticRoleDirectory};
use social_api::authz::AuthorizationEngine;
use social_api::cache::{CachedIdentityStore, InMemoryCache};
use social_api::config::Config;
use social_api::models::{Post, Role, User};
use social_api::rate_limiter::{DisabledRateLimiter, FixedWindowRateLimiter, RateLimiter};
use social_api::repositories::mock::{InMemoryPostRepository, InMemoryUserRepository};
use social_api::routes::{build_routes, AppState};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const BASIC_USER: &str = "ops";
pub const BASIC_PASS: &str = "ops-password";
pub const PASSWORD: &str = "correct horse battery staple";

pub const OWNER: UserId = UserId(1);
pub const MODERATOR: UserId = UserId(2);
pub const ADMIN: UserId = UserId(3);
pub const OTHER_USER: UserId = UserId(4);
pub const OWNED_POST: PostId = PostId(10);

/// Render-only handle; recording into it is not required by these tests.
fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| PrometheusBuilder::new().build_recorder().handle())
        .clone()
}

pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("DATABASE_URL", "postgresql://localhost/social_test"),
        ("AUTH_TOKEN_SECRET", TEST_SECRET),
        ("AUTH_BASIC_USER", BASIC_USER),
        ("AUTH_BASIC_PASS", BASIC_PASS),
        ("APP_ENV", "test"),
        ("REQUEST_TIMEOUT_SECONDS", "5"),
        ("BCRYPT_COST", "4"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (k, v) in overrides {
        vars.insert((*k).to_string(), (*v).to_string());
    }

    Config::from_vars(&vars).expect("test config should be valid")
}

fn role(name: &str) -> Role {
    standard_roles()
        .into_iter()
        .find(|r| r.name == name)
        .expect("standard role")
}

pub fn user(id: UserId, name: &str, role_name: &str) -> User {
    User {
        id,
        username: name.to_string(),
        email: format!("{}@example.com", name),
        is_active: true,
        created_at: Utc::now(),
        role: role(role_name),
    }
}

pub struct TestApp {
    pub router: Router,
    pub users: Arc<InMemoryUserRepository>,
    pub posts: Arc<InMemoryPostRepository>,
    pub roles: Arc<StaticRoleDirectory>,
    pub authenticator: Arc<TokenAuthenticator>,
}

pub struct TestAppBuilder {
    config_overrides: Vec<(&'static str, &'static str)>,
    roles: StaticRoleDirectory,
}

impl TestAppBuilder {
    pub fn with_config(mut self, key: &'static str, value: &'static str) -> Self {
        self.config_overrides.push((key, value));
        self
    }

    pub fn with_roles(mut self, roles: StaticRoleDirectory) -> Self {
        self.roles = roles;
        self
    }

    pub fn build(self) -> TestApp {
        let config = test_config(&self.config_overrides);

        // Low bcrypt cost keeps token issuance tests fast.
        let hash = bcrypt::hash(PASSWORD, 4).unwrap();
        let users = Arc::new(InMemoryUserRepository::new());
        users.insert(user(OWNER, "ana", "user"), hash.clone());
        users.insert(user(MODERATOR, "mo", "moderator"), hash.clone());
        users.insert(user(ADMIN, "ada", "admin"), hash.clone());
        users.insert(user(OTHER_USER, "bob", "user"), hash);

        let posts = Arc::new(InMemoryPostRepository::new());
        let now = Utc::now();
        posts.insert(Post {
            id: OWNED_POST,
            user_id: OWNER,
            title: "hello".to_string(),
            content: "first post".to_string(),
            tags: vec!["intro".to_string()],
            version: 0,
            created_at: now,
            updated_at: now,
        });

        let roles = Arc::new(self.roles);
        let authenticator = Arc::new(TokenAuthenticator::new(&config.token));
        let identities = Arc::new(CachedIdentityStore::new(
            Arc::new(InMemoryCache::new()),
            users.clone(),
            config.identity_cache_ttl,
        ));
        let rate_limiter: Arc<dyn RateLimiter> = if config.rate_limiter.enabled {
            Arc::new(FixedWindowRateLimiter::from_config(&config.rate_limiter))
        } else {
            Arc::new(DisabledRateLimiter)
        };

        let state = Arc::new(AppState {
            rate_limiter,
            authenticator: authenticator.clone(),
            identities,
            authorizer: Arc::new(AuthorizationEngine::new(roles.clone())),
            users: users.clone(),
            posts: posts.clone(),
            config,
            started_at: Instant::now(),
        });

        TestApp {
            router: build_routes(state, metrics_handle()),
            users,
            posts,
            roles,
            authenticator,
        }
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            config_overrides: Vec::new(),
            roles: StaticRoleDirectory::standard(),
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn token_for(&self, id: UserId) -> String {
        self.authenticator
            .generate_token(ClaimSet::for_subject(id))
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response<Body> {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}

pub fn basic_header(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn error_code(response: Response<Body>) -> String {
    body_json(response).await["error"]["code"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
