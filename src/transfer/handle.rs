//! Caller-facing handle for one running transfer.

use std::sync::Arc;

use crate::error::StorageError;

use super::observers::{CallbackId, ObserverList};
use super::progress::{ProgressSnapshot, TransferProgress};
use super::worker::{TransferOutcome, Worker};

/// Couples a transfer's progress with the worker(s) moving its bytes.
///
/// Progress events are relayed to the handle's own subscribers, so callers
/// observe the handle and never the internal progress object.
pub struct TransferHandle {
    progress: Arc<TransferProgress>,
    workers: Vec<Worker>,
    subscribers: Arc<ObserverList<ProgressSnapshot>>,
    relay: CallbackId,
}

impl TransferHandle {
    pub fn new(progress: Arc<TransferProgress>) -> Self {
        let subscribers: Arc<ObserverList<ProgressSnapshot>> = Arc::new(ObserverList::new());
        let relay_to = Arc::clone(&subscribers);
        let relay = progress.register_callback(move |snapshot| relay_to.notify(snapshot));
        Self {
            progress,
            workers: Vec::new(),
            subscribers,
            relay,
        }
    }

    /// Register a worker. Must happen before `start`.
    pub fn add_worker(&mut self, worker: Worker) {
        self.workers.push(worker);
    }

    pub(crate) fn start(&self) -> Result<(), StorageError> {
        for worker in &self.workers {
            if let Err(e) = worker.start() {
                self.abort(false);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&ProgressSnapshot) + Send + Sync + 'static,
    {
        self.subscribers.register(callback)
    }

    pub fn unregister_callback(&self, id: CallbackId) {
        self.subscribers.unregister(id);
    }

    /// Ask every worker to stop at its next poll point. With `block`, also
    /// wait for each worker thread to exit.
    pub fn abort(&self, block: bool) {
        for worker in &self.workers {
            worker.shutdown();
        }
        if block {
            for worker in &self.workers {
                worker.join();
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(Worker::is_finished)
    }

    /// Combined outcome; `None` while any worker is still running.
    /// A failure wins over a cancellation, which wins over completion.
    pub fn outcome(&self) -> Option<TransferOutcome> {
        let mut combined = TransferOutcome::Completed;
        for worker in &self.workers {
            match worker.outcome()? {
                TransferOutcome::Failed(e) => return Some(TransferOutcome::Failed(e)),
                TransferOutcome::Cancelled => combined = TransferOutcome::Cancelled,
                TransferOutcome::Completed => {}
            }
        }
        Some(combined)
    }

    /// Block until every worker has exited and return the combined outcome.
    pub fn wait(&self) -> TransferOutcome {
        for worker in &self.workers {
            worker.join();
        }
        self.outcome()
            .unwrap_or_else(|| TransferOutcome::Failed(Arc::new(StorageError::WorkerPanicked)))
    }
}

impl Drop for TransferHandle {
    fn drop(&mut self) {
        self.progress.unregister_callback(self.relay);
    }
}

impl std::fmt::Debug for TransferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferHandle")
            .field("progress", &self.progress())
            .field("workers", &self.workers)
            .finish()
    }
}
