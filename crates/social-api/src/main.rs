//! Social API
//!
//! Entry point: loads configuration, builds every pipeline component once,
//! and serves the router until SIGINT/SIGTERM.

use common::secret::ExposeSecret;
use social_api::auth::TokenAuthenticator;
use social_api::authz::AuthorizationEngine;
use social_api::cache::{CacheBackend, CachedIdentityStore, InMemoryCache, RedisCache};
use social_api::config::Config;
use social_api::observability;
use social_api::rate_limiter::{DisabledRateLimiter, FixedWindowRateLimiter, RateLimiter};
use social_api::repositories::{PgPostRepository, PgRoleDirectory, PgUserRepository};
use social_api::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired rate limit windows are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Social API");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        env = %config.app_env,
        bind_address = %config.bind_address,
        rate_limit_enabled = config.rate_limiter.enabled,
        redis_enabled = config.redis.enabled,
        "Configuration loaded successfully"
    );

    let metrics_handle = observability::init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations").run(&db_pool).await.map_err(|e| {
        error!("Failed to run migrations: {}", e);
        e
    })?;

    info!("Database connection established");

    let users = Arc::new(PgUserRepository::new(db_pool.clone()));
    let posts = Arc::new(PgPostRepository::new(db_pool.clone()));
    let roles = Arc::new(PgRoleDirectory::new(db_pool));

    let cache = build_cache_backend(&config).await;
    let identities = Arc::new(CachedIdentityStore::new(
        cache,
        users.clone(),
        config.identity_cache_ttl,
    ));

    let shutdown = CancellationToken::new();
    let (rate_limiter, sweeper) = build_rate_limiter(&config, shutdown.clone());

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState {
        authenticator: Arc::new(TokenAuthenticator::new(&config.token)),
        authorizer: Arc::new(AuthorizationEngine::new(roles)),
        identities,
        rate_limiter,
        users,
        posts,
        config,
        started_at: Instant::now(),
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Social API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!("Rate limit sweeper ended abnormally: {}", e);
        }
    }

    info!("Social API shutdown complete");

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "social_api=debug,social=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Redis when enabled and reachable, otherwise the in-process cache.
async fn build_cache_backend(config: &Config) -> Arc<dyn CacheBackend> {
    if !config.redis.enabled {
        info!("Redis disabled, using in-process identity cache");
        return Arc::new(InMemoryCache::new());
    }

    let backend: Arc<dyn CacheBackend> =
        match RedisCache::connect(config.redis.url.expose_secret()).await {
            Ok(cache) => {
                info!("Connected to Redis identity cache");
                Arc::new(cache)
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable, falling back to in-process identity cache");
                Arc::new(InMemoryCache::new())
            }
        };
    backend
}

fn build_rate_limiter(
    config: &Config,
    shutdown: CancellationToken,
) -> (Arc<dyn RateLimiter>, Option<tokio::task::JoinHandle<()>>) {
    if !config.rate_limiter.enabled {
        warn!("Rate limiting disabled");
        return (Arc::new(DisabledRateLimiter), None);
    }

    let limiter = Arc::new(FixedWindowRateLimiter::from_config(&config.rate_limiter));
    let sweeper = limiter.clone().spawn_sweeper(SWEEP_INTERVAL, shutdown);
    let limiter: Arc<dyn RateLimiter> = limiter;
    (limiter, Some(sweeper))
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
