pub mod config;
pub mod logging;

pub mod api;
pub mod client;
pub mod error;
pub mod http;
pub mod storage;
pub mod transfer;

pub use client::DataClient;
pub use error::StorageError;
pub use storage::{ObjectHead, Storage, UploadSource};
pub use transfer::{ProgressSnapshot, TransferHandle, TransferOutcome, TransferProgress};
