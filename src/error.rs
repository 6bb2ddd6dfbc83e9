//! Error taxonomy for storage operations.
//!
//! Cancellation is not an error: it shows up as `TransferOutcome::Cancelled`
//! on the handle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The object (or one of its parts) does not exist (HTTP 404).
    #[error("object '{0}' not found")]
    NotFound(String),

    /// Network-level failure establishing or completing a request.
    #[error("transfer error: {0}")]
    Connection(#[source] curl::Error),

    /// Data request answered with a non-success status.
    #[error("transfer error: code {status}, message: {body}")]
    Transfer { status: u32, body: String },

    /// Bad destination path, bad source, missing token, etc.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Download ended with fewer (or more) bytes than the parts announced.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },

    /// Authorization service refused or failed the request.
    #[error("API error: code {status}, message: {message}")]
    Api { status: u32, message: String },

    /// An object carries unparsable multipart metadata.
    #[error("object '{object}' has invalid number-of-parts metadata '{value}'")]
    Metadata { object: String, value: String },

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer worker panicked")]
    WorkerPanicked,
}

impl StorageError {
    /// True for failures of the data transfer itself (network or HTTP status).
    pub fn is_transfer_error(&self) -> bool {
        matches!(
            self,
            StorageError::Connection(_)
                | StorageError::Transfer { .. }
                | StorageError::PartialTransfer { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<curl::Error> for StorageError {
    fn from(e: curl::Error) -> Self {
        StorageError::Connection(e)
    }
}
