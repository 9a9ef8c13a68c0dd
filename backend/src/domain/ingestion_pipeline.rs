//! Queue, batching, and dead-letter policy for the ingestion pipeline.
//!
//! The values here are what the event-source mapping and the queues are
//! provisioned with. Keeping them as typed policy lets the consumer and its
//! tests reason about redelivery without consulting the deployment.

use std::time::Duration;

use chrono::{DateTime, Utc};

const MAX_BATCH_SIZE: u32 = 10_000;
const UNWINDOWED_BATCH_LIMIT: u32 = 10;
const MAX_BATCHING_WINDOW: Duration = Duration::from_secs(300);
const MAX_CONSUMER_TIMEOUT: Duration = Duration::from_secs(900);
const MIN_CONCURRENCY: u32 = 2;
const MAX_CONCURRENCY: u32 = 1_000;
const VISIBILITY_MARGIN: Duration = Duration::from_secs(10);
const MAX_RECEIVE_COUNT: u32 = 5;
const DEAD_LETTER_RETENTION: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Rejected pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineConfigError {
    #[error("batch_size must be between 1 and {MAX_BATCH_SIZE}, got {0}")]
    BatchSize(u32),
    #[error("max_batching_window must not exceed 300 s, got {0:?}")]
    BatchingWindow(Duration),
    #[error("batch_size {0} above {UNWINDOWED_BATCH_LIMIT} requires a non-zero batching window")]
    WindowRequired(u32),
    #[error("max_concurrency must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}, got {0}")]
    Concurrency(u32),
    #[error("consumer_timeout must be between 1 s and 900 s, got {0:?}")]
    ConsumerTimeout(Duration),
}

/// Consumer and event-source settings for one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Largest number of messages delivered in one invocation.
    pub batch_size: u32,
    /// Longest time messages are held to fill a batch.
    pub max_batching_window: Duration,
    /// Consumer execution time limit.
    pub consumer_timeout: Duration,
    /// Consumer memory in MiB.
    pub consumer_memory_mb: u32,
    /// Upper bound on concurrent consumer invocations.
    pub max_concurrency: u32,
    /// Insert placeholder collections for unknown collection ids.
    pub create_collections_if_missing: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_batching_window: Duration::from_secs(60),
            consumer_timeout: Duration::from_secs(300),
            consumer_memory_mb: 1024,
            max_concurrency: 2,
            create_collections_if_missing: false,
        }
    }
}

impl PipelineConfig {
    /// Settings for the item-generation queue, which processes small
    /// batches immediately with wide fan-out.
    pub fn item_generation() -> Self {
        Self {
            batch_size: 10,
            max_batching_window: Duration::ZERO,
            consumer_timeout: Duration::from_secs(120),
            consumer_memory_mb: 1024,
            max_concurrency: 100,
            create_collections_if_missing: false,
        }
    }

    /// Check the settings against the event-source mapping limits.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use stac_backend::domain::PipelineConfig;
    ///
    /// assert!(PipelineConfig::default().validate().is_ok());
    ///
    /// let unwindowed = PipelineConfig {
    ///     max_batching_window: Duration::ZERO,
    ///     ..PipelineConfig::default()
    /// };
    /// assert!(unwindowed.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), PipelineConfigError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(PipelineConfigError::BatchSize(self.batch_size));
        }
        if self.max_batching_window > MAX_BATCHING_WINDOW {
            return Err(PipelineConfigError::BatchingWindow(self.max_batching_window));
        }
        if self.batch_size > UNWINDOWED_BATCH_LIMIT && self.max_batching_window.is_zero() {
            return Err(PipelineConfigError::WindowRequired(self.batch_size));
        }
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.max_concurrency) {
            return Err(PipelineConfigError::Concurrency(self.max_concurrency));
        }
        if self.consumer_timeout < Duration::from_secs(1)
            || self.consumer_timeout > MAX_CONSUMER_TIMEOUT
        {
            return Err(PipelineConfigError::ConsumerTimeout(self.consumer_timeout));
        }
        Ok(())
    }

    /// Queue settings derived from the consumer timeout.
    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy {
            visibility_timeout: self.consumer_timeout + VISIBILITY_MARGIN,
            max_receive_count: MAX_RECEIVE_COUNT,
            dead_letter_retention: DEAD_LETTER_RETENTION,
        }
    }

    /// Batch trigger derived from size and window.
    pub fn batch_window(&self) -> BatchWindow {
        BatchWindow::new(self.batch_size, self.max_batching_window)
    }
}

/// Redelivery and dead-letter settings of the batching queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    /// How long a received message stays invisible to other consumers.
    pub visibility_timeout: Duration,
    /// Receives allowed before a message moves to the dead-letter queue.
    pub max_receive_count: u32,
    /// How long dead-lettered messages are retained.
    pub dead_letter_retention: Duration,
}

/// What happens to a message that failed on its `receive_count`th receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The message becomes visible again after the visibility timeout.
    Redeliver {
        /// Receives left before dead-lettering.
        remaining: u32,
    },
    /// The message moves to the dead-letter queue.
    DeadLetter,
}

impl QueuePolicy {
    /// Disposition of a failed message.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::{Disposition, PipelineConfig};
    ///
    /// let policy = PipelineConfig::default().queue_policy();
    /// assert_eq!(policy.disposition(1), Disposition::Redeliver { remaining: 4 });
    /// assert_eq!(policy.disposition(5), Disposition::DeadLetter);
    /// ```
    pub fn disposition(&self, receive_count: u32) -> Disposition {
        if receive_count < self.max_receive_count {
            Disposition::Redeliver {
                remaining: self.max_receive_count - receive_count,
            }
        } else {
            Disposition::DeadLetter
        }
    }
}

/// Reason a pending batch is handed to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchTrigger {
    SizeReached,
    WindowElapsed,
}

/// Size-or-window trigger, whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    batch_size: u32,
    window: Duration,
}

impl BatchWindow {
    pub fn new(batch_size: u32, window: Duration) -> Self {
        Self { batch_size, window }
    }

    /// Decide whether `pending` messages, the oldest received at
    /// `oldest_arrival`, should be delivered at `now`.
    pub fn evaluate(
        &self,
        pending: u32,
        oldest_arrival: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<BatchTrigger> {
        if pending == 0 {
            return None;
        }
        if pending >= self.batch_size {
            return Some(BatchTrigger::SizeReached);
        }
        let waited = (now - oldest_arrival).to_std().unwrap_or(Duration::ZERO);
        (waited >= self.window).then_some(BatchTrigger::WindowElapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[rstest]
    fn defaults_match_platform_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.max_batching_window, Duration::from_secs(60));
        assert_eq!(config.consumer_timeout, Duration::from_secs(300));
        assert_eq!(config.consumer_memory_mb, 1024);
        assert_eq!(config.max_concurrency, 2);
        assert!(!config.create_collections_if_missing);
        assert_eq!(config.validate(), Ok(()));
    }

    #[rstest]
    fn item_generation_settings_are_valid() {
        let config = PipelineConfig::item_generation();
        assert_eq!(config.batch_size, 10);
        assert!(config.max_batching_window.is_zero());
        assert_eq!(config.max_concurrency, 100);
        assert_eq!(config.validate(), Ok(()));
    }

    #[rstest]
    #[case(PipelineConfig { batch_size: 0, ..PipelineConfig::default() }, PipelineConfigError::BatchSize(0))]
    #[case(PipelineConfig { batch_size: 10_001, ..PipelineConfig::default() }, PipelineConfigError::BatchSize(10_001))]
    #[case(PipelineConfig { max_batching_window: Duration::from_secs(301), ..PipelineConfig::default() }, PipelineConfigError::BatchingWindow(Duration::from_secs(301)))]
    #[case(PipelineConfig { batch_size: 11, max_batching_window: Duration::ZERO, ..PipelineConfig::default() }, PipelineConfigError::WindowRequired(11))]
    #[case(PipelineConfig { max_concurrency: 1, ..PipelineConfig::default() }, PipelineConfigError::Concurrency(1))]
    #[case(PipelineConfig { max_concurrency: 1_001, ..PipelineConfig::default() }, PipelineConfigError::Concurrency(1_001))]
    #[case(PipelineConfig { consumer_timeout: Duration::ZERO, ..PipelineConfig::default() }, PipelineConfigError::ConsumerTimeout(Duration::ZERO))]
    #[case(PipelineConfig { consumer_timeout: Duration::from_secs(901), ..PipelineConfig::default() }, PipelineConfigError::ConsumerTimeout(Duration::from_secs(901)))]
    fn rejects_out_of_range_settings(
        #[case] config: PipelineConfig,
        #[case] expected: PipelineConfigError,
    ) {
        assert_eq!(config.validate(), Err(expected));
    }

    #[rstest]
    fn ten_message_batches_may_skip_the_window() {
        let config = PipelineConfig {
            batch_size: 10,
            max_batching_window: Duration::ZERO,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[rstest]
    fn queue_policy_tracks_consumer_timeout() {
        let policy = PipelineConfig::default().queue_policy();
        assert_eq!(policy.visibility_timeout, Duration::from_secs(310));
        assert_eq!(policy.max_receive_count, 5);
        assert_eq!(policy.dead_letter_retention, Duration::from_secs(1_209_600));
    }

    #[rstest]
    #[case(1, Disposition::Redeliver { remaining: 4 })]
    #[case(4, Disposition::Redeliver { remaining: 1 })]
    #[case(5, Disposition::DeadLetter)]
    #[case(9, Disposition::DeadLetter)]
    fn disposition_follows_receive_budget(#[case] receives: u32, #[case] expected: Disposition) {
        let policy = PipelineConfig::default().queue_policy();
        assert_eq!(policy.disposition(receives), expected);
    }

    #[rstest]
    fn empty_queue_never_triggers(t0: DateTime<Utc>) {
        let window = PipelineConfig::default().batch_window();
        let later = t0 + chrono::TimeDelta::hours(1);
        assert_eq!(window.evaluate(0, t0, later), None);
    }

    #[rstest]
    fn size_is_checked_before_window(t0: DateTime<Utc>) {
        let window = BatchWindow::new(3, Duration::from_secs(60));
        let later = t0 + chrono::TimeDelta::seconds(120);
        assert_eq!(window.evaluate(3, t0, later), Some(BatchTrigger::SizeReached));
    }

    #[rstest]
    #[case(59, None)]
    #[case(60, Some(BatchTrigger::WindowElapsed))]
    fn window_elapses_on_boundary(
        t0: DateTime<Utc>,
        #[case] waited_secs: i64,
        #[case] expected: Option<BatchTrigger>,
    ) {
        let window = BatchWindow::new(500, Duration::from_secs(60));
        let now = t0 + chrono::TimeDelta::seconds(waited_secs);
        assert_eq!(window.evaluate(1, t0, now), expected);
    }

    #[rstest]
    fn zero_window_triggers_immediately(t0: DateTime<Utc>) {
        let window = PipelineConfig::item_generation().batch_window();
        assert_eq!(window.evaluate(1, t0, t0), Some(BatchTrigger::WindowElapsed));
    }
}
