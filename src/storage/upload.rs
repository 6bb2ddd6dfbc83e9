//! Upload of a file, buffer or stream as a single or multipart object.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::api::Action;
use crate::error::StorageError;
use crate::http;
use crate::transfer::{
    CancelToken, ChunkedReader, MonitoredChunks, PartSplitter, ProgressUpdate, TransferHandle,
    TransferOutcome, TransferProgress, Worker,
};

use super::{destination_name, Storage, MAX_PARTS, NUMBER_OF_PARTS_HEADER};

/// Seekable byte source that can move to the upload worker.
pub trait SeekRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekRead for T {}

/// What to upload.
pub enum UploadSource {
    /// A local file; its size is the upload length.
    Path(PathBuf),
    /// An in-memory buffer.
    Bytes(Vec<u8>),
    /// An open stream. Its length cannot be discovered and must be given.
    Stream {
        reader: Box<dyn SeekRead>,
        length: Option<u64>,
    },
}

impl UploadSource {
    pub fn stream<R: SeekRead + 'static>(reader: R, length: Option<u64>) -> Self {
        UploadSource::Stream {
            reader: Box::new(reader),
            length,
        }
    }

    /// Open the source and return it with its length.
    fn open(self) -> Result<(Box<dyn SeekRead>, u64), StorageError> {
        match self {
            UploadSource::Path(path) => {
                if !path.is_file() {
                    return Err(StorageError::InvalidArgument(format!(
                        "the file '{}' does not exist",
                        path.display()
                    )));
                }
                let file = File::open(&path)?;
                let length = file.metadata()?.len();
                Ok((Box::new(file), length))
            }
            UploadSource::Bytes(bytes) => {
                let length = bytes.len() as u64;
                Ok((Box::new(Cursor::new(bytes)), length))
            }
            UploadSource::Stream { reader, length } => match length {
                Some(length) if length > 0 => Ok((reader, length)),
                _ => Err(StorageError::InvalidArgument(
                    "a stream source needs an explicit, positive length".to_string(),
                )),
            },
        }
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::Path(path)
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        UploadSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(bytes: Vec<u8>) -> Self {
        UploadSource::Bytes(bytes)
    }
}

impl From<&[u8]> for UploadSource {
    fn from(bytes: &[u8]) -> Self {
        UploadSource::Bytes(bytes.to_vec())
    }
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            UploadSource::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            UploadSource::Stream { length, .. } => {
                f.debug_struct("Stream").field("length", length).finish()
            }
        }
    }
}

impl Storage {
    /// Start uploading `source` to `destination`.
    ///
    /// Sources larger than the configured part size are stored as
    /// `<destination>.000`, `<destination>.001`, ... each tagged with the part
    /// count. Validation happens on the calling thread; the bytes move on a
    /// background worker, one part after the other.
    pub fn upload(
        &self,
        source: impl Into<UploadSource>,
        destination: &str,
    ) -> Result<TransferHandle, StorageError> {
        self.check_token("upload(...)")?;
        self.config.validate()?;
        let destination = destination.trim_start_matches('/').to_string();
        if destination.is_empty() {
            return Err(StorageError::InvalidArgument(
                "the destination object name is empty".to_string(),
            ));
        }
        let (reader, length) = source.into().open()?;
        if length == 0 {
            return Err(StorageError::InvalidArgument(
                "the source is empty; there is nothing to upload".to_string(),
            ));
        }

        let splitter = PartSplitter::new(
            Arc::new(Mutex::new(reader)),
            length,
            self.config.part_size_bytes,
        );
        let num_parts = splitter.number_of_parts();
        if num_parts > MAX_PARTS {
            return Err(StorageError::InvalidArgument(format!(
                "{} bytes would need {} parts of {} bytes; at most {} are supported",
                length, num_parts, self.config.part_size_bytes, MAX_PARTS
            )));
        }

        let progress = Arc::new(TransferProgress::new(Some(length), num_parts));
        let mut handle = TransferHandle::new(Arc::clone(&progress));

        tracing::debug!(destination = %destination, length, parts = num_parts, "starting upload");
        let storage = self.clone();
        let name = format!("upload:{}", destination);
        handle.add_worker(Worker::new(name, move |token| {
            storage.upload_job(token, splitter, &destination, &progress)
        }));
        handle.start()?;
        Ok(handle)
    }

    /// Worker body: PUT every part in order, stopping early when cancelled.
    fn upload_job<R: Read + Seek>(
        &self,
        token: &CancelToken,
        splitter: PartSplitter<R>,
        destination: &str,
        progress: &Arc<TransferProgress>,
    ) -> Result<TransferOutcome, StorageError> {
        let num_parts = splitter.number_of_parts();
        let metadata = vec![(NUMBER_OF_PARTS_HEADER.to_string(), num_parts.to_string())];

        for part in splitter {
            if token.is_cancelled() {
                tracing::debug!(destination, "transfer aborted");
                return Ok(TransferOutcome::Cancelled);
            }
            let object = destination_name(destination, part.index, num_parts);
            let mut chunks = MonitoredChunks::new(
                ChunkedReader::with_bufsize(part.reader, self.config.transfer_buf_bytes),
                Arc::clone(progress),
                token.clone(),
            );
            progress.update(ProgressUpdate::part(part.index + 1));

            let url = self.signed_url(Action::PutObject, &object, &metadata)?;
            let res = http::put_streaming(&url, &metadata, part.length, &self.http, || {
                chunks.next()
            })?;
            if res.aborted {
                tracing::debug!(object = %object, "transfer aborted");
                return Ok(TransferOutcome::Cancelled);
            }
            if res.status != 200 {
                return Err(StorageError::Transfer {
                    status: res.status,
                    body: String::from_utf8_lossy(&res.body).into_owned(),
                });
            }
            tracing::debug!(
                object = %object,
                index = part.index + 1,
                of = num_parts,
                "part uploaded"
            );
        }
        tracing::info!(destination, parts = num_parts, "upload complete");
        Ok(TransferOutcome::Completed)
    }
}
