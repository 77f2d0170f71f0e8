//! Error types for streamflate.

use std::fmt;
use std::io;

/// Errors that can occur while driving a compression or decompression session.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred in the underlying source or sink.
    Io(io::Error),

    /// The codec engine could not be initialized.
    LibraryUnavailable {
        /// Why the engine could not be brought up.
        reason: &'static str,
    },

    /// The compression level is outside the supported range.
    InvalidLevel(u32),

    /// The engine rejected the scratch memory reserved for the level.
    InvalidLevelBuffer,

    /// Stateless compression did not fit in the output buffer.
    Overflow {
        /// Size of the output buffer that was too small.
        capacity: usize,
    },

    /// The source ended in the middle of a compressed stream.
    UnexpectedEndOfInput,

    /// The session was closed and cannot be used anymore.
    SessionClosed,

    /// The sink accepted fewer bytes than it was given.
    ShortWrite {
        /// Bytes the sink reported as written.
        written: usize,
        /// Bytes that were handed to the sink.
        expected: usize,
    },

    /// The engine reported a status this layer does not recognize, or stopped
    /// making progress.
    UnknownStatus(i32),

    /// Invalid configuration parameter.
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },
}

impl Error {
    /// Returns `true` for errors that end a session for good.
    ///
    /// I/O errors are the only recoverable kind: the caller may retry the
    /// operation once the source or sink is healthy again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Error::Io(_))
    }

    /// Re-creates a terminal error so it can be handed out again.
    pub(crate) fn replay(&self) -> Error {
        match self {
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), e.to_string())),
            Error::LibraryUnavailable { reason } => Error::LibraryUnavailable { reason },
            Error::InvalidLevel(level) => Error::InvalidLevel(*level),
            Error::InvalidLevelBuffer => Error::InvalidLevelBuffer,
            Error::Overflow { capacity } => Error::Overflow {
                capacity: *capacity,
            },
            Error::UnexpectedEndOfInput => Error::UnexpectedEndOfInput,
            Error::SessionClosed => Error::SessionClosed,
            Error::ShortWrite { written, expected } => Error::ShortWrite {
                written: *written,
                expected: *expected,
            },
            Error::UnknownStatus(code) => Error::UnknownStatus(*code),
            Error::InvalidConfig { message } => Error::InvalidConfig { message },
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::LibraryUnavailable { reason } => {
                write!(f, "codec engine unavailable: {}", reason)
            }
            Error::InvalidLevel(level) => {
                write!(f, "invalid compression level {} (supported 0..=3)", level)
            }
            Error::InvalidLevelBuffer => write!(f, "codec rejected the level buffer"),
            Error::Overflow { capacity } => write!(
                f,
                "stateless compression overflowed a {} byte output buffer",
                capacity
            ),
            Error::UnexpectedEndOfInput => {
                write!(f, "end of input reached inside a compressed stream")
            }
            Error::SessionClosed => write!(f, "session is closed"),
            Error::ShortWrite { written, expected } => write!(
                f,
                "short write: sink accepted {} of {} bytes",
                written, expected
            ),
            Error::UnknownStatus(code) => write!(f, "unknown codec status {}", code),
            Error::InvalidConfig { message } => write!(f, "invalid config: {}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match e {
            Error::Io(inner) => return inner,
            Error::UnexpectedEndOfInput => io::ErrorKind::UnexpectedEof,
            Error::ShortWrite { .. } => io::ErrorKind::WriteZero,
            Error::InvalidLevel(_) | Error::InvalidConfig { .. } => io::ErrorKind::InvalidInput,
            Error::UnknownStatus(_) => io::ErrorKind::InvalidData,
            Error::SessionClosed
            | Error::LibraryUnavailable { .. }
            | Error::InvalidLevelBuffer
            | Error::Overflow { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}
