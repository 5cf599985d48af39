//! Pages the recipient source into the job queue.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use herald_common::types::BroadcastRequest;

use crate::job::DeliveryJob;
use crate::queue::{JobProducer, QueueClosed};
use crate::source::RecipientSource;

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub enqueued: usize,
    pub pages: usize,
    pub duplicates_skipped: usize,
    /// Paging stopped on a source error; later recipients were not scheduled.
    pub source_failed: bool,
}

/// Producer side of a broadcast. Owns the queue's write half.
pub struct Dispatcher {
    broadcast_id: Uuid,
    source: Arc<dyn RecipientSource>,
    request: Arc<BroadcastRequest>,
    producer: JobProducer,
}

impl Dispatcher {
    pub fn new(
        broadcast_id: Uuid,
        source: Arc<dyn RecipientSource>,
        request: Arc<BroadcastRequest>,
        producer: JobProducer,
    ) -> Self {
        Self {
            broadcast_id,
            source,
            request,
            producer,
        }
    }

    /// Enqueue one job per recipient, `batch_size` recipients per page.
    ///
    /// The queue is closed when this returns, whether paging finished or failed.
    pub async fn dispatch(self, batch_size: usize) -> DispatchSummary {
        let Self {
            broadcast_id,
            source,
            request,
            producer,
        } = self;

        let mut summary = DispatchSummary::default();
        let mut seen = HashSet::new();
        let mut after = None;

        'paging: loop {
            let page = match source.fetch_page(after, batch_size).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        broadcast_id = %broadcast_id,
                        error = %e,
                        enqueued = summary.enqueued,
                        "Error loading recipients, remaining recipients will not be notified"
                    );
                    summary.source_failed = true;
                    break;
                }
            };
            summary.pages += 1;

            let Some(last) = page.recipients.last() else {
                break;
            };
            after = Some(last.id);

            for recipient in page.recipients {
                if !seen.insert(recipient.telegram_id) {
                    tracing::debug!(
                        broadcast_id = %broadcast_id,
                        telegram_id = recipient.telegram_id,
                        "Skipping duplicate recipient"
                    );
                    summary.duplicates_skipped += 1;
                    continue;
                }

                let job = DeliveryJob::new(recipient, Arc::clone(&request));
                if let Err(QueueClosed(job)) = producer.push(job).await {
                    tracing::error!(
                        broadcast_id = %broadcast_id,
                        telegram_id = job.recipient.telegram_id,
                        "No workers left to consume jobs, stopping dispatch"
                    );
                    break 'paging;
                }
                summary.enqueued += 1;
            }

            if !page.has_more {
                break;
            }
        }

        producer.close();

        tracing::info!(
            broadcast_id = %broadcast_id,
            enqueued = summary.enqueued,
            pages = summary.pages,
            source_failed = summary.source_failed,
            "Dispatch finished"
        );
        summary
    }
}
