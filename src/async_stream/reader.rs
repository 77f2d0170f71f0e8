//! Async decompression reader.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_io::AsyncRead;
use pin_project_lite::pin_project;

use crate::buffer::BufferPool;
use crate::config::DecoderConfig;
use crate::decoder::ReadStatus;
use crate::decoder::state::{DecodeCore, Step};
use crate::engine::{Deflate, Engine};
use crate::error::Error;

pin_project! {
    /// An async reader that decompresses bytes pulled from an async source.
    ///
    /// Runs the same state machine as [`Decoder`](crate::Decoder), so the
    /// direct and buffered paths, stream members and sticky errors behave
    /// identically. Works with any `futures_io::AsyncRead`; tokio readers can
    /// be adapted with `tokio_util::compat`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use futures_util::AsyncReadExt;
    /// use streamflate::AsyncDecoder;
    ///
    /// async fn demo(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    ///     let mut decoder = AsyncDecoder::new(compressed)?;
    ///     let mut out = Vec::new();
    ///     decoder.read_to_end(&mut out).await?;
    ///     Ok(out)
    /// }
    /// ```
    pub struct AsyncDecoder<R, E: Engine = Deflate> {
        #[pin]
        reader: R,
        core: DecodeCore<E>,
    }
}

impl<R: AsyncRead> AsyncDecoder<R> {
    /// Creates an async decoder with the default configuration.
    pub fn new(reader: R) -> Result<Self, Error> {
        Self::with_config(reader, DecoderConfig::default())
    }

    /// Creates an async decoder with the given configuration.
    pub fn with_config(reader: R, config: DecoderConfig) -> Result<Self, Error> {
        Self::with_engine(reader, Deflate::load()?, config)
    }
}

impl<R, E: Engine> AsyncDecoder<R, E> {
    /// Creates an async decoder that drives `engine`, with buffers from the
    /// global pool.
    pub fn with_engine(reader: R, engine: E, config: DecoderConfig) -> Result<Self, Error> {
        Self::with_pool(reader, engine, config, BufferPool::global())
    }

    /// Creates an async decoder that borrows its scratch buffers from `pool`.
    pub fn with_pool(
        reader: R,
        engine: E,
        config: DecoderConfig,
        pool: Arc<BufferPool>,
    ) -> Result<Self, Error> {
        let core = DecodeCore::new(engine, config, pool)?;
        Ok(Self { reader, core })
    }

    /// Returns the decoder's configuration.
    pub fn config(&self) -> &DecoderConfig {
        self.core.config()
    }

    /// Gets a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Consumes the decoder, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.core.total_in()
    }

    /// Decompressed bytes delivered so far.
    pub fn total_out(&self) -> u64 {
        self.core.total_out()
    }

    /// Releases the scratch buffers and closes the session.
    pub fn close(&mut self) -> Result<(), Error> {
        self.core.close()
    }
}

impl<R: AsyncRead, E: Engine> AsyncDecoder<R, E> {
    /// Polls for decompressed bytes, reporting whether the stream is
    /// complete.
    ///
    /// When the source is not ready but this poll already produced bytes,
    /// those bytes are returned instead of `Pending`.
    pub fn poll_decode(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut [u8],
    ) -> Poll<Result<ReadStatus, Error>> {
        let mut this = self.project();
        let mut written = 0;

        loop {
            match this.core.step(out, &mut written) {
                Err(e) => return Poll::Ready(Err(e)),
                Ok(Step::Ready(status)) => return Poll::Ready(Ok(status)),
                Ok(Step::NeedInput) => {
                    let slot = this.core.input_slot();
                    match this.reader.as_mut().poll_read(cx, slot) {
                        Poll::Ready(Ok(n)) => this.core.supply(n),
                        Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {}
                        Poll::Ready(Err(_)) | Poll::Pending if written > 0 => {
                            return Poll::Ready(Ok(ReadStatus::new(written, false)));
                        }
                        Poll::Ready(Err(e)) => return Poll::Ready(Err(Error::Io(e))),
                        Poll::Pending => return Poll::Pending,
                    }
                }
            }
        }
    }
}

impl<R: AsyncRead, E: Engine> AsyncRead for AsyncDecoder<R, E> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        self.poll_decode(cx, buf)
            .map(|result| result.map(|status| status.written).map_err(io::Error::from))
    }
}
