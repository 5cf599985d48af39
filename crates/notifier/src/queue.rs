//! Bounded job queue: one producer, many consumers.
//!
//! Built on a tokio mpsc channel whose receiver is shared behind a mutex.
//! The producer is the only party able to close the queue, and it does so by
//! being consumed in [`JobProducer::close`] (or dropped).

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::job::DeliveryJob;

/// Create a queue holding at most `capacity` pending jobs.
pub fn job_queue(capacity: usize) -> (JobProducer, JobConsumer) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        JobProducer { tx },
        JobConsumer {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Write half, owned by the dispatcher.
#[derive(Debug)]
pub struct JobProducer {
    tx: mpsc::Sender<DeliveryJob>,
}

/// Returned when every consumer is gone; carries the job that was not queued.
#[derive(Debug)]
pub struct QueueClosed(pub DeliveryJob);

impl JobProducer {
    /// Enqueue a job, waiting while the queue is full.
    pub async fn push(&self, job: DeliveryJob) -> Result<(), QueueClosed> {
        self.tx.send(job).await.map_err(|e| QueueClosed(e.0))
    }

    /// Signal that no more jobs will arrive. Consumers drain what is left.
    pub fn close(self) {
        drop(self.tx);
    }
}

/// Read half, cloned into every worker.
#[derive(Debug, Clone)]
pub struct JobConsumer {
    rx: Arc<Mutex<mpsc::Receiver<DeliveryJob>>>,
}

impl JobConsumer {
    /// Next job in FIFO order, or `None` once the queue is closed and empty.
    ///
    /// The receiver lock is released before the job is returned.
    pub async fn next(&self) -> Option<DeliveryJob> {
        self.rx.lock().await.recv().await
    }
}
