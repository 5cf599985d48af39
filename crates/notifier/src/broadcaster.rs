//! Broadcast orchestration.
//!
//! Each call to [`Broadcaster::broadcast`] builds its own queue, worker pool
//! and dispatcher, spawns them and returns straight away. Nothing is shared
//! between broadcasts except the two collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::BroadcastRequest;

use crate::config::BroadcastConfig;
use crate::dispatcher::{DispatchSummary, Dispatcher};
use crate::queue::job_queue;
use crate::sender::MessageSender;
use crate::source::RecipientSource;
use crate::worker::{Worker, WorkerSummary};

/// Lifecycle of one broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastPhase {
    Created,
    /// Recipients are being paged into the queue.
    Dispatching,
    /// Every page has been read; workers are emptying the queue.
    Draining,
    Done,
}

/// Totals collected by [`BroadcastHandle::wait`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub broadcast_id: Uuid,
    pub enqueued: usize,
    pub delivered: usize,
    pub failed: usize,
    pub source_failed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Entry point for sending one message to every recipient.
#[derive(Clone)]
pub struct Broadcaster {
    source: Arc<dyn RecipientSource>,
    sender: Arc<dyn MessageSender>,
    config: BroadcastConfig,
}

impl Broadcaster {
    /// Fails when the configuration cannot bound the pool or the queue.
    pub fn new(
        source: Arc<dyn RecipientSource>,
        sender: Arc<dyn MessageSender>,
        config: BroadcastConfig,
    ) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            source,
            sender,
            config,
        })
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    /// Start delivering `request` to every recipient and return immediately.
    ///
    /// The request must already be validated. Must be called from within a
    /// tokio runtime. Dropping the returned handle leaves the broadcast
    /// running to completion.
    pub fn broadcast(&self, request: BroadcastRequest) -> BroadcastHandle {
        let broadcast_id = Uuid::new_v4();
        let started_at = Utc::now();
        let batch_size = self.config.batch_size;
        let worker_count = self.config.worker_count;

        tracing::info!(
            broadcast_id = %broadcast_id,
            worker_count,
            batch_size,
            with_image = request.image_url.is_some(),
            "Broadcast accepted"
        );

        let (phase_tx, phase_rx) = watch::channel(BroadcastPhase::Created);
        let tracker = PhaseTracker::new(broadcast_id, phase_tx, worker_count + 1);
        let (producer, consumer) = job_queue(batch_size);

        let workers = (1..=worker_count)
            .map(|worker_id| {
                let worker = Worker::new(
                    worker_id,
                    broadcast_id,
                    consumer.clone(),
                    Arc::clone(&self.sender),
                    &self.config,
                );
                let guard = tracker.task_guard();
                tokio::spawn(async move {
                    let _guard = guard;
                    worker.work().await
                })
            })
            .collect();

        let dispatcher = Dispatcher::new(
            broadcast_id,
            Arc::clone(&self.source),
            Arc::new(request),
            producer,
        );
        tracker.enter(BroadcastPhase::Dispatching);
        let guard = tracker.task_guard();
        let dispatcher = tokio::spawn(async move {
            let summary = dispatcher.dispatch(batch_size).await;
            guard.tracker.enter(BroadcastPhase::Draining);
            summary
        });

        BroadcastHandle {
            broadcast_id,
            started_at,
            phase: phase_rx,
            dispatcher,
            workers,
        }
    }
}

/// Optional join point for a running broadcast.
///
/// Dropping it detaches the broadcast; it keeps running.
pub struct BroadcastHandle {
    broadcast_id: Uuid,
    started_at: DateTime<Utc>,
    phase: watch::Receiver<BroadcastPhase>,
    dispatcher: JoinHandle<DispatchSummary>,
    workers: Vec<JoinHandle<WorkerSummary>>,
}

impl BroadcastHandle {
    pub fn id(&self) -> Uuid {
        self.broadcast_id
    }

    pub fn phase(&self) -> BroadcastPhase {
        *self.phase.borrow()
    }

    /// Receiver notified on every phase change.
    pub fn subscribe(&self) -> watch::Receiver<BroadcastPhase> {
        self.phase.clone()
    }

    /// Whether the dispatcher and every worker have exited.
    pub fn is_finished(&self) -> bool {
        self.dispatcher.is_finished() && self.workers.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every task of the broadcast and collect the totals.
    pub async fn wait(self) -> BroadcastReport {
        let dispatch = match self.dispatcher.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(
                    broadcast_id = %self.broadcast_id,
                    error = %e,
                    "Dispatcher task failed"
                );
                DispatchSummary {
                    source_failed: true,
                    ..Default::default()
                }
            }
        };

        let mut delivered = 0;
        let mut failed = 0;
        for worker in self.workers {
            match worker.await {
                Ok(summary) => {
                    delivered += summary.delivered;
                    failed += summary.failed;
                }
                Err(e) => {
                    tracing::error!(
                        broadcast_id = %self.broadcast_id,
                        error = %e,
                        "Worker task failed"
                    );
                }
            }
        }

        BroadcastReport {
            broadcast_id: self.broadcast_id,
            enqueued: dispatch.enqueued,
            delivered,
            failed,
            source_failed: dispatch.source_failed,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Publishes phase changes and marks the broadcast done when its last task exits.
#[derive(Clone)]
struct PhaseTracker {
    broadcast_id: Uuid,
    tx: Arc<watch::Sender<BroadcastPhase>>,
    remaining: Arc<AtomicUsize>,
}

impl PhaseTracker {
    fn new(broadcast_id: Uuid, tx: watch::Sender<BroadcastPhase>, tasks: usize) -> Self {
        Self {
            broadcast_id,
            tx: Arc::new(tx),
            remaining: Arc::new(AtomicUsize::new(tasks)),
        }
    }

    fn enter(&self, phase: BroadcastPhase) {
        self.tx.send_replace(phase);
    }

    fn task_guard(&self) -> TaskGuard {
        TaskGuard {
            tracker: self.clone(),
        }
    }
}

/// Counts a task as finished when dropped, including on panic.
struct TaskGuard {
    tracker: PhaseTracker,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.tracker.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.enter(BroadcastPhase::Done);
            tracing::info!(broadcast_id = %self.tracker.broadcast_id, "Broadcast finished");
        }
    }
}
