//! Splits a stream of known length into fixed-size parts.

use std::sync::{Arc, Mutex};

use super::ranged::RangedReader;

/// Source shared by every part of one splitter.
pub type SharedSource<R> = Arc<Mutex<R>>;

/// One part of a split stream.
pub struct Part<R> {
    /// 0-based part index.
    pub index: usize,
    /// Exact byte length of this part.
    pub length: u64,
    pub reader: RangedReader<R>,
}

/// Single-pass iterator over the parts of a stream.
///
/// Every part is `part_size` bytes except the last, which holds the remainder.
pub struct PartSplitter<R> {
    source: SharedSource<R>,
    stream_length: u64,
    part_size: u64,
    next: usize,
}

impl<R> PartSplitter<R> {
    /// `part_size` must be positive.
    pub fn new(source: SharedSource<R>, stream_length: u64, part_size: u64) -> Self {
        assert!(part_size > 0, "part_size must be positive");
        Self {
            source,
            stream_length,
            part_size,
            next: 0,
        }
    }

    pub fn number_of_parts(&self) -> usize {
        self.stream_length.div_ceil(self.part_size) as usize
    }

    pub fn stream_length(&self) -> u64 {
        self.stream_length
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }
}

impl<R> Iterator for PartSplitter<R> {
    type Item = Part<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.number_of_parts() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let cursor = index as u64 * self.part_size;
        let length = (self.stream_length - cursor).min(self.part_size);
        Some(Part {
            index,
            length,
            reader: RangedReader::new(Arc::clone(&self.source), cursor, length),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.number_of_parts().saturating_sub(self.next);
        (left, Some(left))
    }
}
