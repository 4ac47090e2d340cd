//! Request-scoped deadlines.
//!
//! A `Deadline` is created once per request from `REQUEST_TIMEOUT_SECONDS`
//! and passed explicitly to every component that performs blocking I/O
//! (role directory, identity cache, persistent store). Cancellation needs no
//! extra plumbing: when the client disconnects axum drops the handler future
//! and every outstanding call with it.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Offset used when `now + timeout` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// `now + timeout`, clamped to a far-future instant instead of overflowing.
pub fn instant_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// The deadline elapsed before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

/// Point in time by which an operation must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: instant_after(timeout),
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The earlier of this deadline and `cap` from now.
    ///
    /// Used for best-effort calls (cache I/O) that must leave budget for the
    /// call that actually matters.
    pub fn capped(&self, cap: Duration) -> Self {
        Self {
            at: self.at.min(instant_after(cap)),
        }
    }

    /// Run `fut`, abandoning it if the deadline passes first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| DeadlineExceeded)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_before_deadline() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let result = deadline.run(async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out() {
        let deadline = Deadline::after(Duration::from_millis(100));
        let result = deadline
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(DeadlineExceeded));
        assert!(deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capped_never_extends() {
        let deadline = Deadline::after(Duration::from_millis(50));
        let capped = deadline.capped(Duration::from_secs(10));
        assert_eq!(capped, deadline);

        let tighter = deadline.capped(Duration::from_millis(10));
        assert!(tighter.remaining() <= Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_does_not_overflow() {
        let deadline = Deadline::after(Duration::from_secs(u64::MAX));
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() > Duration::from_secs(365 * 24 * 60 * 60));

        let capped = deadline.capped(Duration::MAX);
        assert_eq!(capped, deadline);

        let result = deadline.run(async { 1 }).await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_saturates() {
        let deadline = Deadline::after(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }
}
