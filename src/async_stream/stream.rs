//! Async stream adapter for decompression.
//!
//! This module turns an async reader of compressed bytes into a
//! `futures_core::Stream` of decompressed blocks, using the
//! `futures-io::AsyncRead` trait so it stays runtime-agnostic.
//!
//! # Example
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead + Unpin>(reader: R) -> Result<(), streamflate::Error> {
//!     let mut stream = streamflate::decode_async(reader)?;
//!
//!     while let Some(block) = stream.next().await {
//!         let block = block?;
//!         println!("block: {} bytes", block.len());
//!     }
//!     Ok(())
//! }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use futures_io::AsyncRead;
use pin_project_lite::pin_project;

use super::reader::AsyncDecoder;
use crate::config::DecoderConfig;
use crate::engine::{Deflate, Engine};
use crate::error::Error;

pin_project! {
    /// A stream of decompressed blocks read from an async source.
    ///
    /// Each item holds up to [`DecoderConfig::stream_block_size`] bytes. The
    /// stream ends after the last byte of the compressed stream, or after the
    /// first error.
    pub struct DecodeStream<R, E: Engine = Deflate> {
        #[pin]
        decoder: AsyncDecoder<R, E>,
        block: Vec<u8>,
        finished: bool,
    }
}

impl<R, E: Engine> DecodeStream<R, E> {
    /// Wraps an async decoder.
    pub fn new(decoder: AsyncDecoder<R, E>) -> Self {
        let block = vec![0u8; decoder.config().stream_block_size()];
        Self {
            decoder,
            block,
            finished: false,
        }
    }

    /// Consumes the stream, returning the decoder.
    pub fn into_inner(self) -> AsyncDecoder<R, E> {
        self.decoder
    }
}

impl<R: AsyncRead, E: Engine> Stream for DecodeStream<R, E> {
    type Item = Result<Bytes, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        match this.decoder.poll_decode(cx, this.block) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => {
                *this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Ok(status)) => {
                if status.end_of_stream {
                    *this.finished = true;
                }
                if status.written == 0 {
                    *this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Ok(Bytes::copy_from_slice(
                    &this.block[..status.written],
                ))))
            }
        }
    }
}

/// Creates a stream of decompressed blocks from an async reader of raw
/// DEFLATE data.
///
/// Uses `futures_io::AsyncRead` for runtime-agnostic async I/O.
///
/// # Runtime Compatibility
///
/// For tokio users, `tokio_util::compat` converts a `tokio::io::AsyncRead`:
///
/// ```ignore
/// use tokio_util::compat::TokioAsyncReadCompatExt;
///
/// let file = tokio::fs::File::open("data.deflate").await?;
/// let stream = streamflate::decode_async(file.compat())?;
/// ```
///
/// # Errors
///
/// Returns an error if the decoder cannot be constructed.
pub fn decode_async<R: AsyncRead>(reader: R) -> Result<DecodeStream<R>, Error> {
    decode_async_with_config(reader, DecoderConfig::default())
}

/// Like [`decode_async`], with an explicit configuration.
pub fn decode_async_with_config<R: AsyncRead>(
    reader: R,
    config: DecoderConfig,
) -> Result<DecodeStream<R>, Error> {
    Ok(DecodeStream::new(AsyncDecoder::with_config(reader, config)?))
}
