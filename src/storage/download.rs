//! Download of single and multipart objects into a local file.

use std::path::Path;
use std::sync::Arc;

use crate::api::Action;
use crate::error::StorageError;
use crate::http::{self, SinkControl};
use crate::transfer::{
    CancelToken, ProgressUpdate, TransferHandle, TransferOutcome, TransferProgress, Worker,
};

use super::{temp_path, Storage, StorageWriter, StorageWriterBuilder};

/// Reject destinations that are directories, or existing files without `force`.
fn check_destination(destination: &Path, force: bool) -> Result<(), StorageError> {
    if destination.is_dir() {
        return Err(StorageError::InvalidArgument(format!(
            "the path '{}' already exists and is a directory",
            destination.display()
        )));
    }
    if destination.exists() && !force {
        return Err(StorageError::InvalidArgument(format!(
            "the destination file '{}' already exists; use force to overwrite it",
            destination.display()
        )));
    }
    Ok(())
}

impl Storage {
    /// Start downloading `source` (single or multipart) to `destination`.
    ///
    /// Validation, part discovery and size probing happen on the calling
    /// thread; the bytes move on a background worker. Returns as soon as the
    /// worker is running.
    pub fn download(
        &self,
        source: &str,
        destination: impl AsRef<Path>,
        force: bool,
    ) -> Result<TransferHandle, StorageError> {
        self.config.validate()?;
        let destination = destination.as_ref().to_path_buf();
        check_destination(&destination, force)?;

        let parts = self.parts(source)?;
        let mut total = 0u64;
        for part in &parts {
            let head = self.head(part)?;
            if !head.is_success() {
                return Err(head.failure());
            }
            total += head.content_length().ok_or_else(|| StorageError::Transfer {
                status: head.status,
                body: format!("no Content-Length for '{}'", part),
            })?;
        }

        let writer = StorageWriterBuilder::create(&temp_path(&destination))?.build();
        let progress = Arc::new(TransferProgress::new(Some(total), parts.len()));
        let mut handle = TransferHandle::new(Arc::clone(&progress));

        tracing::debug!(
            source,
            destination = %destination.display(),
            parts = parts.len(),
            total,
            "starting download"
        );
        let storage = self.clone();
        handle.add_worker(Worker::new(format!("download:{}", source), move |token| {
            storage.download_job(token, &parts, writer, &destination, total, &progress)
        }));
        handle.start()?;
        Ok(handle)
    }

    /// Worker body: stream every part into the temp file, then move it into place.
    /// The temp file is removed on cancellation or failure.
    fn download_job(
        &self,
        token: &CancelToken,
        parts: &[String],
        writer: StorageWriter,
        destination: &Path,
        expected: u64,
        progress: &TransferProgress,
    ) -> Result<TransferOutcome, StorageError> {
        let received = match self.download_parts(token, parts, &writer, progress) {
            Ok(Some(received)) => received,
            Ok(None) => {
                tracing::debug!(destination = %destination.display(), "transfer aborted");
                writer.discard()?;
                return Ok(TransferOutcome::Cancelled);
            }
            Err(e) => {
                if let Err(discard_err) = writer.discard() {
                    tracing::warn!("could not remove temp file: {}", discard_err);
                }
                return Err(e);
            }
        };
        if received != expected {
            writer.discard()?;
            return Err(StorageError::PartialTransfer { expected, received });
        }
        writer.sync()?;
        writer.finalize(destination)?;
        tracing::info!(
            destination = %destination.display(),
            bytes = received,
            "download complete"
        );
        Ok(TransferOutcome::Completed)
    }

    /// Returns the number of bytes written, or `None` when cancelled.
    fn download_parts(
        &self,
        token: &CancelToken,
        parts: &[String],
        writer: &StorageWriter,
        progress: &TransferProgress,
    ) -> Result<Option<u64>, StorageError> {
        let mut offset = 0u64;
        for (i, part) in parts.iter().enumerate() {
            if token.is_cancelled() {
                return Ok(None);
            }
            progress.update(ProgressUpdate::part(i + 1));
            // Signed URLs are short-lived: authorize each part right before use.
            let url = self.signed_url(Action::GetObject, part, &[])?;
            let stream = http::get_streaming(&url, &self.http, |chunk| {
                if token.is_cancelled() {
                    return Ok(SinkControl::Stop);
                }
                writer.write_at(offset, chunk)?;
                offset += chunk.len() as u64;
                progress.update(ProgressUpdate::transferred(offset));
                Ok(SinkControl::Continue)
            })?;
            if stream.stopped {
                return Ok(None);
            }
            if stream.status == 404 {
                return Err(StorageError::NotFound(part.clone()));
            }
            if !http::is_success(stream.status) {
                return Err(StorageError::Transfer {
                    status: stream.status,
                    body: String::from_utf8_lossy(&stream.error_body).into_owned(),
                });
            }
            tracing::debug!(part = %part, index = i + 1, of = parts.len(), "part downloaded");
        }
        Ok(Some(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_checks() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            check_destination(dir.path(), true),
            Err(StorageError::InvalidArgument(_))
        ));

        let file = dir.path().join("out.bin");
        assert!(check_destination(&file, false).is_ok());
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            check_destination(&file, false),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(check_destination(&file, true).is_ok());
    }
}
