//! Chunk iterator that reports progress and honors cancellation.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use super::progress::{ProgressUpdate, TransferProgress};
use super::worker::CancelToken;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// The worker was shut down; stop quietly.
    #[error("transfer aborted")]
    Aborted,
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// Wraps a chunk iterator for one part of an upload.
///
/// The running byte total starts at the progress object's current
/// `transferred`, so consecutive parts sharing one progress keep counting up.
pub struct MonitoredChunks<I> {
    inner: I,
    progress: Arc<TransferProgress>,
    token: CancelToken,
    total: u64,
}

impl<I> MonitoredChunks<I>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
{
    pub fn new(inner: I, progress: Arc<TransferProgress>, token: CancelToken) -> Self {
        let total = progress.transferred();
        Self {
            inner,
            progress,
            token,
            total,
        }
    }
}

impl<I> Iterator for MonitoredChunks<I>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
{
    type Item = Result<Vec<u8>, MonitorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.token.is_cancelled() {
            return Some(Err(MonitorError::Aborted));
        }
        match self.inner.next()? {
            Ok(chunk) => {
                self.total += chunk.len() as u64;
                self.progress.update(ProgressUpdate::transferred(self.total));
                Some(Ok(chunk))
            }
            Err(e) => Some(Err(MonitorError::Io(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(sizes: &[usize]) -> impl Iterator<Item = io::Result<Vec<u8>>> {
        sizes
            .iter()
            .map(|n| Ok(vec![0u8; *n]))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn updates_progress_per_chunk() {
        let progress = Arc::new(TransferProgress::new(Some(30), 1));
        let m = MonitoredChunks::new(
            chunks(&[10, 10, 10]),
            Arc::clone(&progress),
            CancelToken::new(),
        );
        let out: Vec<_> = m.map(|c| c.unwrap().len()).collect();
        assert_eq!(out, vec![10, 10, 10]);
        assert_eq!(progress.snapshot().transferred, 30);
    }

    #[test]
    fn continues_from_current_progress() {
        let progress = Arc::new(TransferProgress::new(Some(50), 2));
        progress.update(ProgressUpdate::transferred(20));
        let m = MonitoredChunks::new(chunks(&[5, 5]), Arc::clone(&progress), CancelToken::new());
        assert_eq!(m.count(), 2);
        assert_eq!(progress.snapshot().transferred, 30);
    }

    #[test]
    fn cancelled_token_aborts_before_pulling() {
        let progress = Arc::new(TransferProgress::new(Some(30), 1));
        let token = CancelToken::new();
        let mut m =
            MonitoredChunks::new(chunks(&[10, 10, 10]), Arc::clone(&progress), token.clone());
        assert!(m.next().unwrap().is_ok());
        token.cancel();
        assert!(matches!(m.next(), Some(Err(MonitorError::Aborted))));
        assert_eq!(progress.snapshot().transferred, 10);
    }
}
