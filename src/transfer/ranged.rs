//! Read-only window over a byte range of a shared seekable source.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

/// Exposes `[seek_offset, seek_offset + limit)` of a shared source.
///
/// The source is seeked once, on the first read. Reads never go past
/// `limit`. Dropping the reader leaves the source open; it belongs to
/// whoever created it.
pub struct RangedReader<R> {
    source: Arc<Mutex<R>>,
    seek_offset: u64,
    limit: u64,
    transferred: u64,
    initialized: bool,
}

impl<R> RangedReader<R> {
    pub fn new(source: Arc<Mutex<R>>, seek_offset: u64, limit: u64) -> Self {
        Self {
            source,
            seek_offset,
            limit,
            transferred: 0,
            initialized: false,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Bytes returned so far (never more than `limit`).
    pub fn transferred(&self) -> u64 {
        self.transferred
    }
}

impl<R: Read + Seek> Read for RangedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.limit - self.transferred;
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let mut source = self
            .source
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "source lock poisoned"))?;
        if !self.initialized {
            source.seek(SeekFrom::Start(self.seek_offset))?;
            self.initialized = true;
        }
        let want = remaining.min(buf.len() as u64) as usize;
        let n = source.read(&mut buf[..want])?;
        self.transferred += n as u64;
        Ok(n)
    }
}
