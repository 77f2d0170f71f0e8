//! Configuration for compression and decompression sessions.
//!
//! This module provides types to configure how the stream adapters behave:
//!
//! - [`Level`] - Validated compression level (0..=3)
//! - [`Framing`] - Whether the engine wraps streams in a zlib header/trailer
//! - [`DecoderConfig`] - Read-path tuning (direct-path threshold, chunk sizes)
//! - [`EncoderConfig`] - Write-path tuning (level, output scratch size)
//!
//! # Example
//!
//! ```
//! use streamflate::{DecoderConfig, EncoderConfig, Level};
//!
//! let decoder = DecoderConfig::default().with_direct_threshold(4096);
//! decoder.validate()?;
//!
//! let encoder = EncoderConfig::default().with_level(Level::new(2)?);
//! assert_eq!(encoder.level().get(), 2);
//! # Ok::<(), streamflate::Error>(())
//! ```

use crate::error::Error;

/// Size of one decompression-output scratch buffer (640 KiB).
pub const DECOMPRESSION_BUFFER_SIZE: usize = 640 * 1024;

/// Size of one compression-input scratch buffer (640 KiB).
pub const COMPRESSION_INPUT_BUFFER_SIZE: usize = DECOMPRESSION_BUFFER_SIZE;

/// Nominal size of a carry-over buffer: room for several output chunks.
pub const CARRY_OVER_BUFFER_SIZE: usize = 12 * DECOMPRESSION_BUFFER_SIZE;

/// Default encoder output scratch size, which is also the chunk size of the
/// multi-call compression path (128 KiB).
pub const DEFAULT_OUTPUT_BUFFER_SIZE: usize = 128 * 1024;

/// Smallest accepted encoder output scratch size.
pub const MIN_OUTPUT_BUFFER_SIZE: usize = 64;

/// Caller buffers at least this long are decompressed into directly.
pub const DEFAULT_DIRECT_THRESHOLD: usize = 1024;

/// Default block size yielded by the async decode stream (64 KiB).
pub const DEFAULT_STREAM_BLOCK_SIZE: usize = 64 * 1024;

/// A validated compression level.
///
/// Levels run from 0 (fastest) to 3 (smallest output). The engine binding
/// decides how a level maps onto its own tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(u8);

impl Level {
    /// Fastest level.
    pub const FASTEST: Level = Level(0);

    /// Level with the smallest output.
    pub const BEST: Level = Level(3);

    /// Creates a level, rejecting values outside 0..=3.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLevel`] for any value above 3.
    ///
    /// # Example
    ///
    /// ```
    /// use streamflate::Level;
    ///
    /// assert!(Level::new(3).is_ok());
    /// assert!(Level::new(4).is_err());
    /// ```
    pub fn new(level: u32) -> Result<Self, Error> {
        if level > u32::from(Self::BEST.0) {
            return Err(Error::InvalidLevel(level));
        }
        Ok(Self(level as u8))
    }

    /// Returns the numeric level.
    pub const fn get(self) -> u32 {
        self.0 as u32
    }

    /// Iterates over every supported level, fastest first.
    pub fn all() -> impl Iterator<Item = Level> {
        (Self::FASTEST.0..=Self::BEST.0).map(Level)
    }
}

impl TryFrom<u32> for Level {
    type Error = Error;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

/// Stream framing produced and expected by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Framing {
    /// Bare DEFLATE blocks (RFC 1951).
    #[default]
    Raw,
    /// DEFLATE wrapped in a zlib header and Adler-32 trailer (RFC 1950).
    Zlib,
}

/// Configuration for the decompression adapters.
///
/// # Example
///
/// ```
/// use streamflate::DecoderConfig;
///
/// let config = DecoderConfig::default()
///     .with_direct_threshold(512)
///     .with_input_chunk_size(64 * 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderConfig {
    /// Caller buffers at least this long take the direct path.
    direct_threshold: usize,

    /// Upper bound on bytes pulled from the source per read.
    input_chunk_size: usize,

    /// Bytes added to the carry-over buffer each time it runs out of room.
    carry_growth: usize,

    /// Block size yielded by the async decode stream.
    stream_block_size: usize,
}

impl DecoderConfig {
    /// Creates a configuration with explicit tuning values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any value is zero or the input chunk
    /// is larger than a compression-input scratch buffer.
    pub fn new(
        direct_threshold: usize,
        input_chunk_size: usize,
        carry_growth: usize,
    ) -> Result<Self, Error> {
        let config = Self {
            direct_threshold,
            input_chunk_size,
            carry_growth,
            stream_block_size: DEFAULT_STREAM_BLOCK_SIZE,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the direct-path threshold.
    ///
    /// Reads smaller than this go through the carry-over, which stages a whole
    /// decompressed stream member before serving its first byte. Memory for
    /// small reads therefore grows with the member size.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_direct_threshold(mut self, threshold: usize) -> Self {
        self.direct_threshold = threshold;
        self
    }

    /// Sets the per-read input chunk size.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_input_chunk_size(mut self, size: usize) -> Self {
        self.input_chunk_size = size;
        self
    }

    /// Sets the carry-over growth step.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_carry_growth(mut self, growth: usize) -> Self {
        self.carry_growth = growth;
        self
    }

    /// Sets the block size of the async decode stream.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_stream_block_size(mut self, size: usize) -> Self {
        self.stream_block_size = size;
        self
    }

    /// Returns the direct-path threshold.
    pub fn direct_threshold(&self) -> usize {
        self.direct_threshold
    }

    /// Returns the per-read input chunk size.
    pub fn input_chunk_size(&self) -> usize {
        self.input_chunk_size
    }

    /// Returns the carry-over growth step.
    pub fn carry_growth(&self) -> usize {
        self.carry_growth
    }

    /// Returns the async decode stream block size.
    pub fn stream_block_size(&self) -> usize {
        self.stream_block_size
    }

    /// Validates the current configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use streamflate::DecoderConfig;
    ///
    /// let config = DecoderConfig::default().with_carry_growth(0);
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), Error> {
        if self.direct_threshold == 0 {
            return Err(Error::InvalidConfig {
                message: "direct_threshold must be non-zero",
            });
        }
        if self.input_chunk_size == 0 || self.input_chunk_size > COMPRESSION_INPUT_BUFFER_SIZE {
            return Err(Error::InvalidConfig {
                message: "input_chunk_size must be in 1..=COMPRESSION_INPUT_BUFFER_SIZE",
            });
        }
        if self.carry_growth == 0 {
            return Err(Error::InvalidConfig {
                message: "carry_growth must be non-zero",
            });
        }
        if self.stream_block_size == 0 {
            return Err(Error::InvalidConfig {
                message: "stream_block_size must be non-zero",
            });
        }
        Ok(())
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            direct_threshold: DEFAULT_DIRECT_THRESHOLD,
            input_chunk_size: COMPRESSION_INPUT_BUFFER_SIZE,
            carry_growth: CARRY_OVER_BUFFER_SIZE,
            stream_block_size: DEFAULT_STREAM_BLOCK_SIZE,
        }
    }
}

/// Configuration for the compression adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncoderConfig {
    level: Level,
    output_buffer_size: usize,
}

impl EncoderConfig {
    /// Creates a configuration for the given level with the default output
    /// scratch size.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            output_buffer_size: DEFAULT_OUTPUT_BUFFER_SIZE,
        }
    }

    /// Sets the compression level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output scratch size, which is also the chunk size of the
    /// multi-call path.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_output_buffer_size(mut self, size: usize) -> Self {
        self.output_buffer_size = size;
        self
    }

    /// Returns the compression level.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns the output scratch size.
    pub fn output_buffer_size(&self) -> usize {
        self.output_buffer_size
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), Error> {
        if self.output_buffer_size < MIN_OUTPUT_BUFFER_SIZE {
            return Err(Error::InvalidConfig {
                message: "output_buffer_size must be at least MIN_OUTPUT_BUFFER_SIZE",
            });
        }
        Ok(())
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::new(Level::default())
    }
}
