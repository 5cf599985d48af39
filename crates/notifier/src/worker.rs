//! Delivery workers draining the job queue.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::config::{BroadcastConfig, RetryPolicy};
use crate::job::{DeliveryJob, OutgoingMessage};
use crate::queue::JobConsumer;
use crate::sender::{MessageSender, SendError};

/// Jobs handled by one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// A single consumer performing one throttled send per job.
pub struct Worker {
    id: usize,
    broadcast_id: Uuid,
    consumer: JobConsumer,
    sender: Arc<dyn MessageSender>,
    interval: Duration,
    retry: RetryPolicy,
    prefix_separator: String,
}

impl Worker {
    pub fn new(
        id: usize,
        broadcast_id: Uuid,
        consumer: JobConsumer,
        sender: Arc<dyn MessageSender>,
        config: &BroadcastConfig,
    ) -> Self {
        Self {
            id,
            broadcast_id,
            consumer,
            sender,
            interval: config.message_interval,
            retry: config.retry,
            prefix_separator: config.prefix_separator.clone(),
        }
    }

    /// Process jobs until the queue is closed and drained.
    ///
    /// A failed job is logged and counted; it never stops the worker.
    pub async fn work(self) -> WorkerSummary {
        let mut summary = WorkerSummary::default();

        while let Some(job) = self.consumer.next().await {
            tracing::debug!(
                broadcast_id = %self.broadcast_id,
                worker_id = self.id,
                telegram_id = job.recipient.telegram_id,
                username = %job.recipient.username,
                "Sending notification"
            );

            match self.deliver(&job).await {
                Ok(attempts) => {
                    summary.delivered += 1;
                    tracing::info!(
                        broadcast_id = %self.broadcast_id,
                        worker_id = self.id,
                        telegram_id = job.recipient.telegram_id,
                        attempts,
                        "Notification sent"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        broadcast_id = %self.broadcast_id,
                        worker_id = self.id,
                        telegram_id = job.recipient.telegram_id,
                        error = %e,
                        "Failed to send notification"
                    );
                }
            }

            // Pace the pool below the provider's rate limit.
            tokio::time::sleep(self.interval).await;
        }

        tracing::debug!(
            broadcast_id = %self.broadcast_id,
            worker_id = self.id,
            delivered = summary.delivered,
            failed = summary.failed,
            "Worker finished"
        );
        summary
    }

    /// Send one job, retrying per policy. Returns the number of attempts made.
    async fn deliver(&self, job: &DeliveryJob) -> Result<u32, SendError> {
        let message = job.render(&self.prefix_separator);
        let chat = job.recipient.telegram_id;
        let mut attempt = 1;

        loop {
            let result = match &message {
                OutgoingMessage::Text { text } => self.sender.send_text(chat, text).await,
                OutgoingMessage::Image { image_url, caption } => {
                    self.sender.send_image(chat, image_url, caption).await
                }
            };

            let err = match result {
                Ok(()) => return Ok(attempt),
                Err(e) => e,
            };

            let Some(backoff) = self
                .retry
                .next_delay(attempt, err.is_retryable(), err.retry_after())
            else {
                return Err(err);
            };
            // A retry is still a send, so it keeps the pacing interval too.
            let delay = backoff.max(self.interval);

            tracing::debug!(
                broadcast_id = %self.broadcast_id,
                worker_id = self.id,
                telegram_id = chat,
                attempt,
                delay = ?delay,
                error = %err,
                "Retrying notification"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
