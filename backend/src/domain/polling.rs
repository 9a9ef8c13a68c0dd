//! Suspension abstraction for bounded polling loops.

use std::time::Duration;

use async_trait::async_trait;

/// Async clock-independent sleeping abstraction for polling.
#[async_trait]
pub trait PollSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    ///
    /// use async_trait::async_trait;
    /// use stac_backend::domain::PollSleeper;
    ///
    /// struct NoSleep;
    ///
    /// #[async_trait]
    /// impl PollSleeper for NoSleep {
    ///     async fn sleep(&self, _duration: Duration) {}
    /// }
    /// ```
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl PollSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
