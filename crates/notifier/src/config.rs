//! Broadcast tuning: pool size, queue capacity, pacing and retry policy.

use std::time::Duration;

use herald_common::config::AppConfig;
use herald_common::error::AppError;

/// Default recipients per page (and queue capacity).
pub const DEFAULT_BATCH_SIZE: usize = 20;
/// Default number of delivery workers.
pub const DEFAULT_WORKER_COUNT: usize = 5;
/// Default pause each worker takes after a send.
pub const DEFAULT_MESSAGE_INTERVAL: Duration = Duration::from_secs(1);

/// Settings shared by every broadcast started from one [`Broadcaster`].
///
/// [`Broadcaster`]: crate::Broadcaster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastConfig {
    /// Page size requested from the recipient source and job queue capacity.
    pub batch_size: usize,
    /// Number of concurrent workers per broadcast.
    pub worker_count: usize,
    /// Delay after each job. The pool sends at most
    /// `worker_count / message_interval` messages per unit of time.
    pub message_interval: Duration,
    pub retry: RetryPolicy,
    /// Placed between a request prefix and the message body.
    pub prefix_separator: String,
}

impl BroadcastConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "broadcast batch size must be greater than zero".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(AppError::Config(
                "broadcast worker count must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "max send attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
            message_interval: DEFAULT_MESSAGE_INTERVAL,
            retry: RetryPolicy::default(),
            prefix_separator: " ".to_string(),
        }
    }
}

impl From<&AppConfig> for BroadcastConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            batch_size: config.broadcast_batch_size,
            worker_count: config.broadcast_worker_count,
            message_interval: Duration::from_millis(config.broadcast_message_interval_ms),
            retry: RetryPolicy {
                max_attempts: config.broadcast_max_send_attempts,
                backoff: Duration::from_millis(config.broadcast_retry_backoff_ms),
            },
            prefix_separator: config.broadcast_prefix_separator.clone(),
        }
    }
}

/// How a worker treats a failed send.
///
/// The default makes a single attempt: failures are logged and the worker
/// moves on to the next job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per job, including the first one.
    pub max_attempts: u32,
    /// Minimum delay before a retry; a longer provider `retry_after` wins.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before the next attempt, or `None` when the job should give up.
    pub fn next_delay(
        &self,
        attempt: u32,
        retryable: bool,
        retry_after: Option<Duration>,
    ) -> Option<Duration> {
        if !retryable || attempt >= self.max_attempts {
            return None;
        }
        Some(retry_after.map_or(self.backoff, |hint| hint.max(self.backoff)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(1),
        }
    }
}
