use std::{collections::VecDeque, io};

use crate::{source::ChunkSource, BoxFuture, Sequence};

/// Input left over after running a parser.
///
/// This yields the unconsumed part of the buffered chunks followed by the chunks the source did
/// not produce yet. It is itself a [`ChunkSource`], so it can be passed on to run another parser.
pub struct RemainingInput<S: Sequence> {
    chunks: VecDeque<S>,
    source: Option<Box<dyn ChunkSource<S>>>,
}

impl<S: Sequence> RemainingInput<S> {
    pub(crate) fn new(chunks: VecDeque<S>, source: Option<Box<dyn ChunkSource<S>>>) -> Self {
        RemainingInput { chunks, source }
    }

    /// Reads all of the remaining input into a single sequence.
    pub async fn into_sequence(mut self) -> io::Result<S> {
        let mut parts = vec![];
        while let Some(chunk) = self.next_chunk().await? {
            parts.push(chunk);
        }
        Ok(S::concat(&parts))
    }
}

impl<S: Sequence> ChunkSource<S> for RemainingInput<S> {
    fn next_chunk(&mut self) -> BoxFuture<'_, io::Result<Option<S>>> {
        Box::pin(async move {
            if let Some(chunk) = self.chunks.pop_front() {
                return Ok(Some(chunk));
            }
            let Some(source) = &mut self.source else {
                return Ok(None);
            };
            let chunk = source.next_chunk().await;
            if !matches!(chunk, Ok(Some(_))) {
                self.source = None;
            }
            chunk
        })
    }
}
