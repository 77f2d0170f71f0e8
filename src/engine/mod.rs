//! Codec engine contract.
//!
//! The stream adapters never compress anything themselves. They drive an
//! [`Engine`]: a block-oriented primitive set that makes bounded progress per
//! call and reports what it consumed, what it produced and a [`Status`].
//!
//! - [`Engine`] - Session construction, reset, and the three call shapes
//! - [`CodecStep`] - Result of one engine call
//! - [`Status`] - Status codes an engine may report
//! - [`Deflate`] - DEFLATE/zlib engine backed by `flate2`

mod deflate;

pub use deflate::Deflate;

use crate::config::Level;
use crate::error::Error;

/// Status reported by one engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Progress was made (or nothing was asked for).
    Ok,
    /// The engine used up its input and wants more.
    EndOfInput,
    /// The output buffer filled up and more output is pending.
    NeedMoreOutput,
    /// The session's compression level is not supported.
    InvalidLevel,
    /// The scratch memory for the level was rejected.
    InvalidLevelBuffer,
    /// A stateless call did not fit in its output buffer.
    Overflow,
    /// Any code this layer does not know.
    Unknown(i32),
}

impl Status {
    /// Returns the integer code of this status.
    pub const fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::EndOfInput => 1,
            Status::NeedMoreOutput => 2,
            Status::Overflow => -1,
            Status::InvalidLevel => -4,
            Status::InvalidLevelBuffer => -5,
            Status::Unknown(code) => code,
        }
    }

    /// Maps an integer code back to a status.
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Status::Ok,
            1 => Status::EndOfInput,
            2 => Status::NeedMoreOutput,
            -1 => Status::Overflow,
            -4 => Status::InvalidLevel,
            -5 => Status::InvalidLevelBuffer,
            other => Status::Unknown(other),
        }
    }

    /// Returns `true` for statuses that only steer the call loop.
    pub const fn is_clean(self) -> bool {
        matches!(self, Status::Ok | Status::EndOfInput | Status::NeedMoreOutput)
    }

    /// Converts a non-clean status into the session error it stands for.
    ///
    /// `level` is the session's compression level, if it has one.
    pub fn into_error(self, level: Option<Level>) -> Option<Error> {
        match self {
            Status::Ok | Status::EndOfInput | Status::NeedMoreOutput => None,
            Status::InvalidLevel => Some(match level {
                Some(level) => Error::InvalidLevel(level.get()),
                None => Error::UnknownStatus(self.code()),
            }),
            Status::InvalidLevelBuffer => Some(Error::InvalidLevelBuffer),
            // Only the stateless caller knows the capacity and maps this itself.
            Status::Overflow => Some(Error::UnknownStatus(self.code())),
            Status::Unknown(code) => Some(Error::UnknownStatus(code)),
        }
    }
}

/// Result of a single engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecStep {
    /// Input bytes the engine consumed.
    pub consumed: usize,
    /// Output bytes the engine produced.
    pub produced: usize,
    /// Status of the call.
    pub status: Status,
    /// The engine reached the end of the current stream.
    pub finished: bool,
}

impl CodecStep {
    /// Creates a step that has not finished the stream.
    pub const fn new(consumed: usize, produced: usize, status: Status) -> Self {
        Self {
            consumed,
            produced,
            status,
            finished: false,
        }
    }

    /// Marks the step as having finished the stream.
    pub const fn finish(mut self) -> Self {
        self.finished = true;
        self
    }

    /// Returns `true` if the call consumed or produced anything.
    pub const fn made_progress(&self) -> bool {
        self.consumed > 0 || self.produced > 0
    }
}

/// A block-oriented compression engine.
///
/// Sessions are plain values owned by one adapter. Every call works on
/// caller-owned slices and may stop early. The adapter loops until its own
/// contract is met.
///
/// Engines are capability handles: obtaining one proves the engine is usable,
/// so adapters never check a global "loaded" flag.
pub trait Engine {
    /// Compression session state.
    type Compressor;

    /// Decompression session state.
    type Decompressor;

    /// Starts a compression session at `level`.
    fn new_compressor(&self, level: Level) -> Result<Self::Compressor, Error>;

    /// Starts a decompression session.
    fn new_decompressor(&self) -> Result<Self::Decompressor, Error>;

    /// Returns a compression session to its initial state. The next call
    /// begins a new stream, header included.
    fn reset_compressor(&self, session: &mut Self::Compressor);

    /// Returns a decompression session to its initial state.
    fn reset_decompressor(&self, session: &mut Self::Decompressor);

    /// Upper bound on the stateless output for `len` input bytes, framing
    /// included. May overestimate, must never underestimate.
    fn compress_bound(&self, len: usize) -> usize;

    /// Compresses all of `input` into `output` as one complete stream.
    ///
    /// Reports [`Status::Overflow`] when `output` is too small.
    fn stateless_compress(
        &self,
        session: &mut Self::Compressor,
        input: &[u8],
        output: &mut [u8],
    ) -> CodecStep;

    /// Feeds `input` to the session and drains what fits into `output`.
    ///
    /// With `end_of_stream` set the engine finishes the stream once all input
    /// is consumed. The step reports `finished` when the trailer is out.
    fn compress(
        &self,
        session: &mut Self::Compressor,
        input: &[u8],
        output: &mut [u8],
        end_of_stream: bool,
    ) -> CodecStep;

    /// Feeds `input` to the session and drains what fits into `output`.
    fn decompress(
        &self,
        session: &mut Self::Decompressor,
        input: &[u8],
        output: &mut [u8],
    ) -> CodecStep;
}
