//! Decompression stream adapter.
//!
//! [`Decoder`] turns any [`std::io::Read`] source of compressed bytes into a
//! reader of decompressed bytes, whatever size of buffer the caller reads
//! with:
//!
//! - Buffers at least [`DecoderConfig::direct_threshold`] long are filled by
//!   the engine directly (the direct path).
//! - Smaller buffers are served from a carry-over buffer that holds decoded
//!   bytes the caller has not taken yet (the buffered path).
//!
//! # Example
//!
//! ```
//! use std::io::Read;
//! use streamflate::{Decoder, Encoder, Level};
//!
//! let compressed = Encoder::compress_bytes(b"Hello World\n", Level::FASTEST)?;
//!
//! let mut decoder = Decoder::new(&compressed[..])?;
//! let mut text = String::new();
//! decoder.read_to_string(&mut text)?;
//! assert_eq!(text, "Hello World\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub(crate) mod state;

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use bytes::buf::Reader;
use bytes::{Buf, Bytes, BytesMut};

use self::state::{DecodeCore, Step};
use crate::buffer::BufferPool;
use crate::config::{DEFAULT_STREAM_BLOCK_SIZE, DecoderConfig};
use crate::engine::{Deflate, Engine};
use crate::error::Error;
use crate::util::read_some;

/// Result of one [`Decoder::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadStatus {
    /// Bytes written into the caller's buffer.
    pub written: usize,
    /// The stream is fully decoded and every byte has been delivered.
    pub end_of_stream: bool,
}

impl ReadStatus {
    pub(crate) const fn new(written: usize, end_of_stream: bool) -> Self {
        Self {
            written,
            end_of_stream,
        }
    }
}

/// A reader that decompresses bytes pulled from a source.
///
/// Scratch buffers come from a shared [`BufferPool`] and go back to it when
/// the decoder is closed or dropped.
///
/// A stream made of several back-to-back compressed members (as produced by
/// repeated [`Encoder`](crate::Encoder) writes) decodes as one byte stream.
pub struct Decoder<R, E: Engine = Deflate> {
    source: R,
    core: DecodeCore<E>,
}

impl<R: Read> Decoder<R> {
    /// Creates a decoder with the default configuration and raw DEFLATE
    /// framing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LibraryUnavailable`] if the engine cannot be brought
    /// up.
    pub fn new(source: R) -> Result<Self, Error> {
        Self::with_config(source, DecoderConfig::default())
    }

    /// Creates a decoder with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn with_config(source: R, config: DecoderConfig) -> Result<Self, Error> {
        Self::with_engine(source, Deflate::load()?, config)
    }
}

impl<R, E: Engine> Decoder<R, E> {
    /// Creates a decoder that drives `engine`, with buffers from the global
    /// pool.
    pub fn with_engine(source: R, engine: E, config: DecoderConfig) -> Result<Self, Error> {
        Self::with_pool(source, engine, config, BufferPool::global())
    }

    /// Creates a decoder that borrows its scratch buffers from `pool`.
    pub fn with_pool(
        source: R,
        engine: E,
        config: DecoderConfig,
        pool: Arc<BufferPool>,
    ) -> Result<Self, Error> {
        let core = DecodeCore::new(engine, config, pool)?;
        Ok(Self { source, core })
    }

    /// Returns the decoder's configuration.
    pub fn config(&self) -> &DecoderConfig {
        self.core.config()
    }

    /// Gets a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Gets a mutable reference to the underlying source.
    ///
    /// Reading from it directly will corrupt the decompressed stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Consumes the decoder, returning the underlying source.
    ///
    /// Compressed bytes already pulled from the source but not yet decoded
    /// are lost.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.core.total_in()
    }

    /// Decompressed bytes delivered so far.
    pub fn total_out(&self) -> u64 {
        self.core.total_out()
    }

    /// Reinitializes the session in place and swaps in a new source,
    /// returning the old one. Clears any sticky error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the decoder was closed.
    pub fn reset(&mut self, source: R) -> Result<R, Error> {
        self.core.reset()?;
        Ok(std::mem::replace(&mut self.source, source))
    }

    /// Releases the scratch buffers and closes the session.
    ///
    /// Every later call fails with [`Error::SessionClosed`], including a
    /// second `close`.
    pub fn close(&mut self) -> Result<(), Error> {
        self.core.close()
    }
}

impl<R: Read, E: Engine> Decoder<R, E> {
    /// Decompresses into `out`, reporting how many bytes were written and
    /// whether the stream is complete.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the source fails. The session stays usable.
    /// - [`Error::UnexpectedEndOfInput`] if the source ends inside a stream.
    /// - [`Error::UnknownStatus`] if the compressed data is corrupt.
    /// - [`Error::SessionClosed`] after [`close`](Decoder::close).
    ///
    /// Codec errors are sticky: once one is returned, every later call
    /// returns it too. When a call has already produced bytes before hitting
    /// an error, it returns those bytes and the error comes with the next
    /// call.
    pub fn decode(&mut self, out: &mut [u8]) -> Result<ReadStatus, Error> {
        let mut written = 0;
        loop {
            match self.core.step(out, &mut written)? {
                Step::Ready(status) => return Ok(status),
                Step::NeedInput => match read_some(&mut self.source, self.core.input_slot()) {
                    Ok(n) => self.core.supply(n),
                    Err(_) if written > 0 => return Ok(ReadStatus::new(written, false)),
                    Err(e) => return Err(Error::Io(e)),
                },
            }
        }
    }
}

impl Decoder<Reader<Bytes>> {
    /// Decompresses an in-memory raw DEFLATE stream.
    ///
    /// # Example
    ///
    /// ```
    /// use streamflate::{Decoder, Encoder, Level};
    ///
    /// let compressed = Encoder::compress_bytes(b"hello hello hello", Level::BEST)?;
    /// let data = Decoder::decompress_bytes(compressed)?;
    /// assert_eq!(&data[..], b"hello hello hello");
    /// # Ok::<(), streamflate::Error>(())
    /// ```
    pub fn decompress_bytes(data: impl Into<Bytes>) -> Result<Bytes, Error> {
        let mut decoder = Decoder::new(data.into().reader())?;
        let mut out = BytesMut::new();
        let mut block = vec![0u8; DEFAULT_STREAM_BLOCK_SIZE];

        loop {
            let status = decoder.decode(&mut block)?;
            out.extend_from_slice(&block[..status.written]);
            if status.end_of_stream {
                break;
            }
        }

        decoder.close()?;
        Ok(out.freeze())
    }
}

impl<R: Read, E: Engine> Read for Decoder<R, E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.decode(buf)?.written)
    }
}

impl<R: fmt::Debug, E: Engine + fmt::Debug> fmt::Debug for Decoder<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("source", &self.source)
            .field("config", self.core.config())
            .field("total_in", &self.core.total_in())
            .field("total_out", &self.core.total_out())
            .finish_non_exhaustive()
    }
}
