//! Multipart transfer engine.
//!
//! Building blocks shared by uploads and downloads: progress accounting with
//! observers, chunked and range-bounded readers, part splitting, monitored
//! chunk iteration, and the cancellable background worker behind a
//! `TransferHandle`.

mod chunked;
mod handle;
mod monitor;
mod observers;
mod progress;
mod ranged;
mod splitter;
mod worker;

pub use chunked::ChunkedReader;
pub use handle::TransferHandle;
pub use monitor::{MonitorError, MonitoredChunks};
pub use observers::{CallbackId, ObserverList};
pub use progress::{ProgressSnapshot, ProgressUpdate, TransferProgress};
pub use ranged::RangedReader;
pub use splitter::{Part, PartSplitter, SharedSource};
pub use worker::{CancelToken, TransferOutcome, Worker};
