//! Ingestion Queue
//!
//! Bounded-concurrency worker pool for one bulk upload. The router submits tasks while
//! the archive is still being decoded; a fixed number of workers pull them from a shared
//! channel and run the store and index calls for each.
//!
//! ## Completion
//! `finish` closes the channel and joins every worker. It consumes the queue, so the
//! batch counters are read exactly once, after the last task has settled.

use super::types::{IngestStats, IngestionTask};
use crate::storage::facade::StorageFacade;

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Handle used by producers to enqueue tasks.
#[derive(Clone)]
pub struct TaskSubmitter {
    sender: mpsc::UnboundedSender<IngestionTask>,
}

impl TaskSubmitter {
    /// Returns `false` if the queue is already closed.
    pub fn submit(&self, task: IngestionTask) -> bool {
        self.sender.send(task).is_ok()
    }
}

pub struct IngestionQueue {
    sender: mpsc::UnboundedSender<IngestionTask>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<IngestStats>,
}

impl IngestionQueue {
    /// Spawns `worker_count` workers (at least one) that drain the queue.
    pub fn start(
        storage: Arc<dyn StorageFacade>,
        worker_count: usize,
        stats: Arc<IngestStats>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let worker_count = worker_count.max(1);

        let workers = (0..worker_count)
            .map(|worker_id| {
                let storage = storage.clone();
                let receiver = receiver.clone();
                let stats = stats.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, storage, receiver, stats).await;
                })
            })
            .collect();

        tracing::debug!("Ingestion queue started with {} workers", worker_count);

        Self {
            sender,
            workers,
            stats,
        }
    }

    pub fn submitter(&self) -> TaskSubmitter {
        TaskSubmitter {
            sender: self.sender.clone(),
        }
    }

    /// Waits for every submitted task to settle. Returns `(accepted, failed)`.
    ///
    /// Outstanding submitters must be dropped first, otherwise the workers never see
    /// the channel close.
    pub async fn finish(self) -> (usize, usize) {
        drop(self.sender);

        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!("Ingestion worker panicked: {}", e);
            }
        }

        (self.stats.accepted(), self.stats.failed())
    }
}

async fn worker_loop(
    worker_id: usize,
    storage: Arc<dyn StorageFacade>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<IngestionTask>>>,
    stats: Arc<IngestStats>,
) {
    tracing::trace!("Ingestion worker {} started", worker_id);

    loop {
        // Hold the lock only while waiting for the next task.
        let task = receiver.lock().await.recv().await;
        let Some(task) = task else {
            break;
        };

        if process_task(storage.as_ref(), &task).await {
            stats.record_accepted();
        } else {
            stats.record_failed();
        }
    }

    tracing::trace!("Ingestion worker {} stopped", worker_id);
}

/// Stores and indexes one envelope concurrently. Both calls always run to completion;
/// the task is accepted only if both succeed. Nothing is rolled back on a partial failure.
pub async fn process_task(storage: &dyn StorageFacade, task: &IngestionTask) -> bool {
    let (stored, indexed) = tokio::join!(
        storage.store_envelope(&task.envelope),
        storage.index_envelope(&task.envelope)
    );

    match (stored, indexed) {
        (Ok(()), Ok(())) => {
            tracing::trace!("Ingested {}", task.content_id);
            true
        }
        (stored, indexed) => {
            if let Err(e) = stored {
                tracing::warn!("Failed to store {}: {}", task.content_id, e);
            }
            if let Err(e) = indexed {
                tracing::warn!("Failed to index {}: {}", task.content_id, e);
            }
            false
        }
    }
}
