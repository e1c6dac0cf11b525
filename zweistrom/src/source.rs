//! Asynchronous sources of input chunks.
use std::{io, iter::Fuse};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc,
};

use crate::{BoxFuture, Sequence};

/// An asynchronous source of input chunks.
///
/// A source is pulled on demand, i.e. only when a parser needs to look at input that is not
/// buffered yet. Returning `Ok(None)` signals the end of the input. After that, or after an error
/// was returned, the source is not pulled again.
pub trait ChunkSource<S>: 'static {
    /// Returns the next chunk of input.
    fn next_chunk(&mut self) -> BoxFuture<'_, io::Result<Option<S>>>;
}

impl<S: 'static> ChunkSource<S> for Box<dyn ChunkSource<S>> {
    fn next_chunk(&mut self) -> BoxFuture<'_, io::Result<Option<S>>> {
        (**self).next_chunk()
    }
}

/// A source yielding the chunks of an iterator.
pub struct IterSource<I> {
    iter: Fuse<I>,
}

impl<I: Iterator> IterSource<I> {
    /// Creates a source yielding the items of `iter` as chunks.
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        IterSource {
            iter: iter.into_iter().fuse(),
        }
    }
}

impl<S, I> ChunkSource<S> for IterSource<I>
where
    S: 'static,
    I: Iterator<Item = S> + 'static,
{
    fn next_chunk(&mut self) -> BoxFuture<'_, io::Result<Option<S>>> {
        let chunk = self.iter.next();
        Box::pin(async move { Ok(chunk) })
    }
}

/// A source consisting of a single chunk containing all of the input.
pub fn complete<S: Sequence>(input: impl Into<S>) -> IterSource<std::option::IntoIter<S>> {
    IterSource::new(Some(input.into()))
}

/// A source yielding chunks of bytes read from an [`AsyncRead`] instance.
pub struct IoSource<R> {
    read: R,
    chunk_size: usize,
}

impl<R> IoSource<R>
where
    R: AsyncRead + Unpin + 'static,
{
    const DEFAULT_CHUNK_SIZE: usize = 16 << 10;

    /// Creates a source reading from an [`AsyncRead`] instance.
    pub fn new(read: R) -> Self {
        IoSource {
            read,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the number of bytes that are read at once.
    ///
    /// This sets the size of the [`read`][AsyncReadExt::read] requests made. Note that this is just
    /// an upper bound. Depending on the [`AsyncRead`] implementation, smaller chunks may be read.
    /// Only a single successful read is issued per chunk, so that interactive, line buffered input
    /// is passed on as soon as it arrives.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }
}

impl<R> ChunkSource<Vec<u8>> for IoSource<R>
where
    R: AsyncRead + Unpin + 'static,
{
    fn next_chunk(&mut self) -> BoxFuture<'_, io::Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            let mut buf = vec![0; self.chunk_size];
            loop {
                match self.read.read(&mut buf).await {
                    Ok(0) => return Ok(None),
                    Ok(n) => {
                        buf.truncate(n);
                        return Ok(Some(buf));
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                }
            }
        })
    }
}

/// A source yielding the chunks received over a [`tokio::sync::mpsc`] channel.
///
/// The input ends when all senders are dropped.
pub struct ChannelSource<S> {
    receiver: mpsc::Receiver<S>,
}

impl<S> ChannelSource<S> {
    /// Creates a source from the receiving half of a channel.
    pub fn new(receiver: mpsc::Receiver<S>) -> Self {
        ChannelSource { receiver }
    }
}

impl<S: 'static> ChunkSource<S> for ChannelSource<S> {
    fn next_chunk(&mut self) -> BoxFuture<'_, io::Result<Option<S>>> {
        Box::pin(async move { Ok(self.receiver.recv().await) })
    }
}
