use std::collections::VecDeque;

use crate::Sequence;

/// Accumulates pushed chunks and provides random access in front of a consumed position.
///
/// Unlike a contiguous buffer, pushed chunks are never concatenated. Instead the buffer keeps the
/// list of chunks that are not fully consumed yet together with the number of consumed elements of
/// the first chunk. Chunks that become fully consumed, including chunks that were empty to begin
/// with, are evicted right away, so the first chunk, if any, always has at least one unconsumed
/// element.
///
/// Each chunk is stored as a vector of its elements, so that indexing into a chunk takes constant
/// time even for sequences like `String` that cannot be indexed by element directly. For `Vec<u8>`
/// this reuses the chunk's allocation.
///
/// Skipping past the end of the buffered data is allowed. The excess is remembered and applied to
/// chunks pushed later.
pub struct ChunkBuffer<S: Sequence> {
    chunks: VecDeque<Vec<S::Element>>,
    // Invariant: `chunks.front().len() > index_in_first` whenever `chunks` is non-empty
    index_in_first: usize,
    // Invariant: non-zero only when `chunks` is empty
    pending_skip: usize,
}

impl<S: Sequence> Default for ChunkBuffer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sequence> ChunkBuffer<S> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        ChunkBuffer {
            chunks: VecDeque::new(),
            index_in_first: 0,
            pending_skip: 0,
        }
    }

    /// Appends a chunk.
    pub fn push(&mut self, chunk: S) {
        self.chunks.push_back(chunk.into_elements());
        self.settle();
    }

    /// Advances the consumed position by `n` elements.
    pub fn skip(&mut self, n: usize) {
        self.pending_skip += n;
        self.settle();
    }

    fn settle(&mut self) {
        while let Some(first) = self.chunks.front() {
            let available = first.len() - self.index_in_first;
            if self.pending_skip < available {
                self.index_in_first += self.pending_skip;
                self.pending_skip = 0;
                return;
            }
            self.pending_skip -= available;
            self.index_in_first = 0;
            self.chunks.pop_front();
        }
    }

    /// Number of buffered elements in front of the consumed position.
    pub fn len(&self) -> usize {
        if self.pending_skip != 0 {
            return 0;
        }
        self.chunks.iter().map(Vec::len).sum::<usize>() - self.index_in_first
    }

    /// Returns `true` if no elements are buffered in front of the consumed position.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the element `offset` elements after the consumed position if it is buffered.
    pub fn peek(&self, offset: usize) -> Option<S::Element> {
        if self.pending_skip != 0 {
            return None;
        }
        let mut offset = offset + self.index_in_first;
        for chunk in &self.chunks {
            if let Some(&element) = chunk.get(offset) {
                return Some(element);
            }
            offset -= chunk.len();
        }
        None
    }

    /// Returns the elements `start..end` relative to the consumed position if all of them are
    /// buffered.
    pub fn peek_sequence(&self, start: usize, end: usize) -> Option<S> {
        if end <= start {
            return Some(S::empty());
        }
        if self.len() < end {
            return None;
        }

        let start = start + self.index_in_first;
        let end = end + self.index_in_first;

        let mut elements = Vec::with_capacity(end - start);
        let mut chunk_start = 0;
        for chunk in &self.chunks {
            let chunk_end = chunk_start + chunk.len();
            if chunk_end > start && chunk_start < end {
                let from = start.max(chunk_start) - chunk_start;
                let to = end.min(chunk_end) - chunk_start;
                elements.extend_from_slice(&chunk[from..to]);
            }
            if chunk_end >= end {
                break;
            }
            chunk_start = chunk_end;
        }

        Some(S::from_element_vec(elements))
    }

    /// Consumes the buffer, returning the unconsumed data as a list of chunks.
    pub fn into_chunks(mut self) -> VecDeque<S> {
        if let Some(first) = self.chunks.front_mut() {
            first.drain(..self.index_in_first);
        }
        self.chunks.into_iter().map(S::from_element_vec).collect()
    }
}
