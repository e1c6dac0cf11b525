use std::{
    cell::{Cell, RefCell},
    io,
};

use tokio::sync::Mutex;
use tracing::{trace, warn};

use crate::{
    chunk_buffer::ChunkBuffer, error::ImplementationError, remaining::RemainingInput,
    source::ChunkSource, ParserError, Sequence,
};

/// Pulls chunks from a [`ChunkSource`] on demand and buffers them for any number of cursors.
///
/// All positions passed to an `InputReader` are absolute. Buffered data is only released when the
/// root cursor advances past it, so every open cursor, which is never behind the root, can peek
/// at its own position.
///
/// IO errors are deferred: an IO error marks the input as complete and is stored, which forces the
/// parsing logic to fail or finish. The stored error is checked
/// once parsing is done, see [`take_io_error`][Self::take_io_error].
pub struct InputReader<S: Sequence> {
    // Never borrowed across a suspension point.
    buffer: RefCell<ChunkBuffer<S>>,
    buffer_position: Cell<usize>,
    source: Mutex<Box<dyn ChunkSource<S>>>,
    pulls: Cell<u64>,
    complete: Cell<bool>,
    io_error: RefCell<Option<io::Error>>,
}

impl<S: Sequence> InputReader<S> {
    /// Creates a reader pulling from `source`.
    pub fn new(source: impl ChunkSource<S>) -> Self {
        Self::from_boxed_dyn_source(Box::new(source))
    }

    /// Creates a reader pulling from a boxed `source`.
    #[inline(never)]
    pub fn from_boxed_dyn_source(source: Box<dyn ChunkSource<S>>) -> Self {
        InputReader {
            buffer: RefCell::new(ChunkBuffer::new()),
            buffer_position: Cell::new(0),
            source: Mutex::new(source),
            pulls: Cell::new(0),
            complete: Cell::new(false),
            io_error: RefCell::new(None),
        }
    }

    /// Returns whether the source was exhausted, either by reaching its end or by an IO error.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete.get()
    }

    /// Returns the element at the absolute `position`, pulling more input as needed.
    ///
    /// Returns `None` when the input ends before `position`.
    pub async fn peek(&self, position: usize) -> Result<Option<S::Element>, ParserError> {
        loop {
            let offset = self.offset_of(position)?;
            if let Some(element) = self.buffer.borrow().peek(offset) {
                return Ok(Some(element));
            }
            if !self.request_more().await {
                return Ok(None);
            }
        }
    }

    /// Returns the elements in the absolute range `start..end`, pulling more input as needed.
    ///
    /// Returns `None` when the input ends before `end`.
    pub async fn peek_sequence(&self, start: usize, end: usize) -> Result<Option<S>, ParserError> {
        loop {
            let offset = self.offset_of(start)?;
            let len = end.saturating_sub(start);
            if let Some(sequence) = self.buffer.borrow().peek_sequence(offset, offset + len) {
                return Ok(Some(sequence));
            }
            if !self.request_more().await {
                return Ok(None);
            }
        }
    }

    /// Releases all buffered data before the absolute `position`.
    pub fn release_to(&self, position: usize) {
        let buffer_position = self.buffer_position.get();
        if position > buffer_position {
            self.buffer.borrow_mut().skip(position - buffer_position);
            self.buffer_position.set(position);
        }
    }

    /// Returns an encountered IO error as `Err(io_err)`.
    ///
    /// This resets the stored IO error and returns `Ok(())` if no IO error is stored.
    pub fn take_io_error(&self) -> io::Result<()> {
        match self.io_error.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Consumes the reader, returning the input not released so far.
    pub fn into_remaining(self) -> RemainingInput<S> {
        let chunks = self.buffer.into_inner().into_chunks();
        let source = (!self.complete.get()).then(|| self.source.into_inner());
        RemainingInput::new(chunks, source)
    }

    #[inline]
    fn offset_of(&self, position: usize) -> Result<usize, ParserError> {
        let buffer_position = self.buffer_position.get();
        if position < buffer_position {
            return Err(released_position(position, buffer_position));
        }
        Ok(position - buffer_position)
    }

    /// Pulls one more chunk from the source.
    ///
    /// Returns `false` if the source is exhausted. Returns `true` without pulling when another
    /// caller pulled while this one was waiting for the source.
    #[cold]
    #[inline(never)]
    async fn request_more(&self) -> bool {
        if self.complete.get() {
            return false;
        }
        let pulls = self.pulls.get();
        let mut source = self.source.lock().await;
        if self.pulls.get() != pulls {
            return true;
        }

        match source.next_chunk().await {
            Ok(Some(chunk)) => {
                trace!(len = chunk.len(), "pulled input chunk");
                self.buffer.borrow_mut().push(chunk);
            }
            Ok(None) => {
                trace!("input source exhausted");
                self.complete.set(true);
            }
            Err(err) => {
                warn!(%err, "IO error while pulling input");
                *self.io_error.borrow_mut() = Some(err);
                self.complete.set(true);
            }
        }
        self.pulls.set(pulls + 1);
        true
    }
}

#[cold]
#[inline(never)]
fn released_position(position: usize, buffer_position: usize) -> ParserError {
    ImplementationError::new(
        position,
        format!("input before position {buffer_position} was already released"),
    )
    .into()
}
