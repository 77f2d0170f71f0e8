//! Compression stream adapter.
//!
//! [`Encoder`] compresses every buffer handed to it into one complete
//! compressed stream member and writes it to a sink. Small inputs are
//! compressed in a single stateless engine call; larger ones are walked in
//! chunks of the output scratch size.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use streamflate::{Encoder, Level};
//!
//! let mut encoder = Encoder::with_level(Vec::new(), Level::BEST)?;
//! encoder.write_all(b"Hello World\n")?;
//! encoder.close()?;
//!
//! let compressed = encoder.into_inner();
//! assert!(!compressed.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::io::{self, Write};

use bytes::buf::Writer;
use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace, warn};

use crate::config::{EncoderConfig, Level};
use crate::engine::{Deflate, Engine, Status};
use crate::error::Error;
use crate::util::write_once;

/// A writer that compresses bytes into a sink.
///
/// Each [`encode`](Encoder::encode) call (and so each `write`) emits one
/// self-contained stream member. A [`Decoder`](crate::Decoder) reads the
/// concatenation back as a single byte stream.
pub struct Encoder<W, E: Engine = Deflate> {
    sink: W,
    engine: E,
    session: E::Compressor,
    level: Level,
    output: Box<[u8]>,
    /// Part of the current member has reached the sink.
    member_started: bool,
    error: Option<Error>,
    total_in: u64,
    total_out: u64,
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder at the fastest level with raw DEFLATE framing.
    pub fn new(sink: W) -> Result<Self, Error> {
        Self::with_config(sink, EncoderConfig::default())
    }

    /// Creates an encoder at `level`.
    pub fn with_level(sink: W, level: Level) -> Result<Self, Error> {
        Self::with_config(sink, EncoderConfig::new(level))
    }

    /// Creates an encoder with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn with_config(sink: W, config: EncoderConfig) -> Result<Self, Error> {
        Self::with_engine(sink, Deflate::load()?, config)
    }
}

impl<W, E: Engine> Encoder<W, E> {
    /// Creates an encoder that drives `engine`.
    pub fn with_engine(sink: W, engine: E, config: EncoderConfig) -> Result<Self, Error> {
        config.validate()?;
        let session = engine.new_compressor(config.level())?;
        debug!(
            "encoder: session ready (level {}, output buffer {})",
            config.level().get(),
            config.output_buffer_size()
        );

        Ok(Self {
            sink,
            engine,
            session,
            level: config.level(),
            output: vec![0u8; config.output_buffer_size()].into_boxed_slice(),
            member_started: false,
            error: None,
            total_in: 0,
            total_out: 0,
        })
    }

    /// Returns the compression level.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Gets a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Gets a mutable reference to the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Consumes the encoder, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Compressed bytes written to the sink so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Reinitializes the session in place and swaps in a new sink, returning
    /// the old one. Clears any sticky error.
    pub fn reset(&mut self, sink: W) -> W {
        self.engine.reset_compressor(&mut self.session);
        self.member_started = false;
        self.error = None;
        self.total_in = 0;
        self.total_out = 0;
        debug!("encoder: session reset");
        std::mem::replace(&mut self.sink, sink)
    }

    /// Records `err` as sticky when it ends the session. A sink error ends
    /// it too once the sink holds part of the failed member.
    fn fail(&mut self, err: Error) -> Error {
        if !err.is_terminal() && !self.member_started {
            return err;
        }
        warn!("encoder: session failed: {}", err);
        let replay = err.replay();
        self.error = Some(err);
        replay
    }
}

impl<W: Write, E: Engine> Encoder<W, E> {
    /// Compresses `input` into one stream member and writes it to the sink.
    ///
    /// Returns `input.len()` on success. Empty input writes nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the sink fails. Sticky only when an earlier pass of
    ///   the same member was already written.
    /// - [`Error::ShortWrite`] if the sink accepts only part of a write.
    /// - [`Error::Overflow`] if a stateless call does not fit its buffer.
    /// - Any error mapped from a non-clean engine status.
    ///
    /// Sticky errors are returned by every later call until
    /// [`reset`](Encoder::reset).
    pub fn encode(&mut self, input: &[u8]) -> Result<usize, Error> {
        if let Some(err) = &self.error {
            return Err(err.replay());
        }
        if input.is_empty() {
            return Ok(0);
        }

        self.member_started = false;
        let result = if self.engine.compress_bound(input.len()) <= self.output.len() {
            self.encode_stateless(input)
        } else {
            self.encode_chunked(input)
        };

        match result {
            Ok(()) => {
                self.total_in += input.len() as u64;
                Ok(input.len())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Returns the sticky error if there is one, otherwise flushes the sink.
    pub fn close(&mut self) -> Result<(), Error> {
        if let Some(err) = &self.error {
            return Err(err.replay());
        }
        self.sink.flush()?;
        debug!(
            "encoder: closed after {} bytes in, {} bytes out",
            self.total_in, self.total_out
        );
        Ok(())
    }

    fn encode_stateless(&mut self, input: &[u8]) -> Result<(), Error> {
        trace!("encoder: stateless call for {} bytes", input.len());
        let step = self
            .engine
            .stateless_compress(&mut self.session, input, &mut self.output);

        if step.status == Status::Overflow || (step.status.is_clean() && !step.finished) {
            return Err(Error::Overflow {
                capacity: self.output.len(),
            });
        }
        if let Some(err) = step.status.into_error(Some(self.level)) {
            return Err(err);
        }
        self.flush_output(step.produced)
    }

    fn encode_chunked(&mut self, input: &[u8]) -> Result<(), Error> {
        let chunk_size = self.output.len();
        trace!(
            "encoder: chunked path for {} bytes in {} byte chunks",
            input.len(),
            chunk_size
        );

        // A fresh session re-emits the stream header.
        self.engine.reset_compressor(&mut self.session);

        let mut offset = 0;
        loop {
            let end = (offset + chunk_size).min(input.len());
            let last = end == input.len();
            let mut chunk = &input[offset..end];

            loop {
                let step = self
                    .engine
                    .compress(&mut self.session, chunk, &mut self.output, last);
                chunk = &chunk[step.consumed..];

                if let Some(err) = step.status.into_error(Some(self.level)) {
                    return Err(err);
                }
                self.flush_output(step.produced)?;

                if step.finished {
                    return Ok(());
                }
                if !step.made_progress() {
                    if chunk.is_empty() && !last {
                        break;
                    }
                    return Err(Error::UnknownStatus(step.status.code()));
                }
                if chunk.is_empty() && !last && step.produced < self.output.len() {
                    break;
                }
            }

            offset = end;
        }
    }

    fn flush_output(&mut self, n: usize) -> Result<(), Error> {
        if n == 0 {
            return Ok(());
        }
        write_once(&mut self.sink, &self.output[..n])?;
        self.member_started = true;
        self.total_out += n as u64;
        Ok(())
    }
}

impl Encoder<Writer<BytesMut>> {
    /// Compresses `data` into a single in-memory raw DEFLATE stream.
    ///
    /// # Example
    ///
    /// ```
    /// use streamflate::{Decoder, Encoder, Level};
    ///
    /// let compressed = Encoder::compress_bytes(&[0u8; 4096], Level::FASTEST)?;
    /// assert!(compressed.len() < 4096);
    /// assert_eq!(Decoder::decompress_bytes(compressed)?.len(), 4096);
    /// # Ok::<(), streamflate::Error>(())
    /// ```
    pub fn compress_bytes(data: &[u8], level: Level) -> Result<Bytes, Error> {
        let mut encoder = Encoder::with_level(BytesMut::new().writer(), level)?;
        encoder.encode(data)?;
        encoder.close()?;
        Ok(encoder.into_inner().into_inner().freeze())
    }
}

impl<W: Write, E: Engine> Write for Encoder<W, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.encode(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl<W: fmt::Debug, E: Engine + fmt::Debug> fmt::Debug for Encoder<W, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("sink", &self.sink)
            .field("engine", &self.engine)
            .field("level", &self.level)
            .field("output_buffer_size", &self.output.len())
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish_non_exhaustive()
    }
}
