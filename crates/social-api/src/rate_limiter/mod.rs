//! Fixed-window request admission.
//!
//! Each client key owns one window entry `{count, window_start}`. The first
//! request for an unseen or expired key opens a new window with `count = 1`;
//! later requests inside the window are admitted while `count` stays within
//! the limit. A rejected request does not consume quota.
//!
//! The windows live in a [`DashMap`]. `entry()` holds the shard write lock for
//! the whole read-modify-write, so concurrent callers for the same key are
//! serialized and `count` can never exceed the limit. Expired entries are
//! reset lazily on access and removed by one background sweeper
//! ([`FixedWindowRateLimiter::spawn_sweeper`]) so memory stays bounded by the
//! number of keys seen within one window.
//!
//! Windows are fixed, not sliding: a client can be admitted up to twice the
//! limit across a window boundary.

use common::config::RateLimiterConfig;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// The key is over its limit until the current window ends.
    Rejected { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }

    /// Time until the key may be admitted again (zero when allowed).
    pub fn retry_after(&self) -> Duration {
        match self {
            RateLimitDecision::Allowed => Duration::ZERO,
            RateLimitDecision::Rejected { retry_after } => *retry_after,
        }
    }
}

/// Admission control seam used by the HTTP layer.
pub trait RateLimiter: Send + Sync {
    /// Decide whether one more request for `key` is admitted.
    fn allow(&self, key: &str) -> RateLimitDecision;

    /// Number of keys currently holding state.
    fn tracked_keys(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// In-process fixed-window limiter keyed by client identifier.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    windows: DashMap<String, WindowEntry>,
    limit: u32,
    window: Duration,
}

impl FixedWindowRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn from_config(config: &RateLimiterConfig) -> Self {
        Self::new(config.requests_per_window, config.window)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request for `key`.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();

        // The RefMut keeps the shard locked until it is dropped at the end of
        // this function, so the read-modify-write below is atomic per key.
        let mut entry = self
            .windows
            .entry(key.to_owned())
            .or_insert(WindowEntry {
                count: 0,
                window_start: now,
            });

        let elapsed = now.saturating_duration_since(entry.window_start);
        if entry.count == 0 || elapsed >= self.window {
            entry.count = 1;
            entry.window_start = now;
            return RateLimitDecision::Allowed;
        }

        if entry.count < self.limit {
            entry.count += 1;
            return RateLimitDecision::Allowed;
        }

        RateLimitDecision::Rejected {
            retry_after: self.window.saturating_sub(elapsed),
        }
    }

    /// Remove every entry whose window has elapsed. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.windows.retain(|_, entry| {
            let live = now.saturating_duration_since(entry.window_start) < self.window;
            if !live {
                removed += 1;
            }
            live
        });

        removed
    }

    /// Start the background sweeper, running every `interval` until `cancel`
    /// fires.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                target: "social.ratelimit.sweeper",
                interval_ms = interval.as_millis() as u64,
                "Rate limit sweeper started"
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!(target: "social.ratelimit.sweeper", "Rate limit sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = self.sweep_expired();
                        if removed > 0 {
                            debug!(
                                target: "social.ratelimit.sweeper",
                                removed,
                                remaining = self.windows.len(),
                                "Swept expired rate limit windows"
                            );
                        }
                    }
                }
            }
        })
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn allow(&self, key: &str) -> RateLimitDecision {
        self.check(key)
    }

    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Limiter used when rate limiting is disabled: admits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRateLimiter;

impl RateLimiter for DisabledRateLimiter {
    fn allow(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}
