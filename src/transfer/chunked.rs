//! Lazy fixed-size chunking of a byte stream.

use std::io::{self, Read};

use crate::config::TRANSFER_BUF_SIZE;

/// Iterator over chunks of at most `bufsize` bytes read from `R`.
///
/// Each `read` call of the inner stream produces one chunk; iteration ends at
/// the first empty read.
pub struct ChunkedReader<R> {
    inner: R,
    bufsize: usize,
    done: bool,
}

impl<R: Read> ChunkedReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_bufsize(inner, TRANSFER_BUF_SIZE)
    }

    pub fn with_bufsize(inner: R, bufsize: usize) -> Self {
        Self {
            inner,
            bufsize: bufsize.max(1),
            done: false,
        }
    }
}

impl<R: Read> Iterator for ChunkedReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; self.bufsize];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(buf));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chunks_are_bounded_and_complete() {
        let data: Vec<u8> = (0u8..=255).cycle().take(1000).collect();
        let chunks: Vec<Vec<u8>> = ChunkedReader::with_bufsize(Cursor::new(data.clone()), 300)
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() <= 300));
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut it = ChunkedReader::with_bufsize(Cursor::new(Vec::<u8>::new()), 16);
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }
}
