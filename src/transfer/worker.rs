//! Background transfer worker with cooperative cancellation.
//!
//! The job runs on its own OS thread and receives a `CancelToken` it must
//! poll between chunks and parts; blocking I/O is never interrupted.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::StorageError;

/// Shared shutdown flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a transfer job ended.
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    Completed,
    Cancelled,
    Failed(Arc<StorageError>),
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferOutcome::Cancelled)
    }

    pub fn error(&self) -> Option<&StorageError> {
        match self {
            TransferOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

type Job = Box<dyn FnOnce(&CancelToken) -> Result<TransferOutcome, StorageError> + Send>;

/// A job plus the thread running it. Built stopped; `start` spawns it once.
pub struct Worker {
    name: String,
    token: CancelToken,
    job: Mutex<Option<Job>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    outcome: Arc<Mutex<Option<TransferOutcome>>>,
}

impl Worker {
    pub fn new<F>(name: impl Into<String>, job: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<TransferOutcome, StorageError> + Send + 'static,
    {
        Self {
            name: name.into(),
            token: CancelToken::new(),
            job: Mutex::new(Some(Box::new(job))),
            thread: Mutex::new(None),
            outcome: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Spawn the job thread. Calling it again is a no-op.
    pub fn start(&self) -> Result<(), StorageError> {
        let job = match self.job.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(job) => job,
            None => return Ok(()),
        };
        let token = self.token.clone();
        let outcome = Arc::clone(&self.outcome);
        let name = self.name.clone();
        let handle = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let result = match panic::catch_unwind(AssertUnwindSafe(|| job(&token))) {
                    Ok(Ok(o)) => o,
                    Ok(Err(e)) => {
                        tracing::debug!(worker = %name, error = %e, "transfer job failed");
                        TransferOutcome::Failed(Arc::new(e))
                    }
                    Err(_) => {
                        tracing::warn!(worker = %name, "transfer worker panicked");
                        TransferOutcome::Failed(Arc::new(StorageError::WorkerPanicked))
                    }
                };
                *outcome.lock().unwrap_or_else(|e| e.into_inner()) = Some(result);
            })?;
        *self.thread.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the job thread has exited.
    pub fn is_finished(&self) -> bool {
        if self.outcome.lock().unwrap_or_else(|e| e.into_inner()).is_some() {
            return true;
        }
        self.thread
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(false)
    }

    pub fn outcome(&self) -> Option<TransferOutcome> {
        self.outcome.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Wait for the job thread to exit. A panicking job is recorded as failed.
    pub fn join(&self) {
        let handle = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!(worker = %self.name, "transfer worker panicked");
                let mut slot = self.outcome.lock().unwrap_or_else(|e| e.into_inner());
                if slot.is_none() {
                    *slot = Some(TransferOutcome::Failed(Arc::new(StorageError::WorkerPanicked)));
                }
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("shutdown", &self.is_shutdown())
            .field("outcome", &self.outcome())
            .finish()
    }
}
