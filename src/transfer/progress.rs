//! Observable transfer progress (bytes, speed, current part).
//!
//! Written by the transfer worker, read by any thread through `snapshot()` or
//! through registered callbacks, which run on the worker thread.

use std::sync::Mutex;
use std::time::Instant;

use super::observers::{CallbackId, ObserverList};

/// Point-in-time copy of a transfer's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Total size in bytes, if known.
    pub total: Option<u64>,
    /// Bytes transferred so far.
    pub transferred: u64,
    /// Instantaneous speed in bytes per second.
    pub speed: f64,
    /// Current part (1-indexed).
    pub part: usize,
    /// Total number of parts.
    pub parts: usize,
}

impl ProgressSnapshot {
    /// Fraction complete in [0.0, 1.0]; `None` if the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.transferred as f64 / total as f64).min(1.0))
    }

    /// Estimated seconds remaining (None if total unknown or speed is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total?.saturating_sub(self.transferred);
        if remaining == 0 {
            return Some(0.0);
        }
        if self.speed <= 0.0 {
            return None;
        }
        Some(remaining as f64 / self.speed)
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressUpdate {
    pub total: Option<u64>,
    pub transferred: Option<u64>,
    pub part: Option<usize>,
    pub parts: Option<usize>,
}

impl ProgressUpdate {
    pub fn transferred(bytes: u64) -> Self {
        Self {
            transferred: Some(bytes),
            ..Self::default()
        }
    }

    pub fn part(part: usize) -> Self {
        Self {
            part: Some(part),
            ..Self::default()
        }
    }
}

struct State {
    snapshot: ProgressSnapshot,
    /// Time and byte count of the last sample that moved `transferred` forward.
    last_sample: Option<(Instant, u64)>,
}

pub struct TransferProgress {
    state: Mutex<State>,
    callbacks: ObserverList<ProgressSnapshot>,
}

impl TransferProgress {
    pub fn new(total: Option<u64>, parts: usize) -> Self {
        Self {
            state: Mutex::new(State {
                snapshot: ProgressSnapshot {
                    total,
                    transferred: 0,
                    speed: 0.0,
                    part: 1,
                    parts,
                },
                last_sample: None,
            }),
            callbacks: ObserverList::new(),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
            .clone()
    }

    pub fn transferred(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
            .transferred
    }

    /// Apply `update` and fire every callback, even when nothing changed.
    pub fn update(&self, update: ProgressUpdate) {
        self.update_at(update, Instant::now());
    }

    pub(crate) fn update_at(&self, update: ProgressUpdate, now: Instant) {
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(total) = update.total {
                state.snapshot.total = Some(total);
            }
            if let Some(part) = update.part {
                state.snapshot.part = part;
            }
            if let Some(parts) = update.parts {
                state.snapshot.parts = parts;
            }
            if let Some(transferred) = update.transferred {
                if transferred > state.snapshot.transferred {
                    state.snapshot.speed = match state.last_sample {
                        Some((at, bytes)) => {
                            let elapsed = now.saturating_duration_since(at).as_secs_f64();
                            if elapsed > 0.0 {
                                transferred.saturating_sub(bytes) as f64 / elapsed
                            } else {
                                state.snapshot.speed
                            }
                        }
                        None => 0.0,
                    };
                    state.last_sample = Some((now, transferred));
                }
                state.snapshot.transferred = transferred;
            }
            state.snapshot.clone()
        };
        self.callbacks.notify(&snapshot);
    }

    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&ProgressSnapshot) + Send + Sync + 'static,
    {
        self.callbacks.register(callback)
    }

    pub fn unregister_callback(&self, id: CallbackId) {
        self.callbacks.unregister(id);
    }
}

impl std::fmt::Debug for TransferProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferProgress")
            .field("snapshot", &self.snapshot())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
