//! DEFLATE engine backed by `flate2`'s low-level state machines.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};
use log::{debug, trace};

use super::{CodecStep, Engine, Status};
use crate::config::{Framing, Level};
use crate::error::Error;

/// zlib's `Z_STREAM_ERROR`, reported when compression fails.
const Z_STREAM_ERROR: i32 = -2;

/// zlib's `Z_DATA_ERROR`, reported when compressed input is malformed.
const Z_DATA_ERROR: i32 = -3;

/// DEFLATE engine.
///
/// Produces raw DEFLATE by default, or zlib-wrapped streams with
/// [`Framing::Zlib`].
///
/// # Example
///
/// ```
/// use streamflate::{Deflate, Framing};
///
/// let engine = Deflate::with_framing(Framing::Zlib)?;
/// assert_eq!(engine.framing(), Framing::Zlib);
/// # Ok::<(), streamflate::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deflate {
    framing: Framing,
}

impl Deflate {
    /// Brings up the engine with raw DEFLATE framing.
    pub fn load() -> Result<Self, Error> {
        Self::with_framing(Framing::Raw)
    }

    /// Brings up the engine with the given framing.
    pub fn with_framing(framing: Framing) -> Result<Self, Error> {
        debug!("deflate engine ready ({:?} framing)", framing);
        Ok(Self { framing })
    }

    /// Returns the engine's framing.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    fn zlib_header(&self) -> bool {
        self.framing == Framing::Zlib
    }
}

/// Maps the 0..=3 level scale onto flate2's 0..=9 scale.
fn compression_for(level: Level) -> Compression {
    match level.get() {
        0 => Compression::new(1),
        1 => Compression::new(3),
        2 => Compression::new(6),
        _ => Compression::new(9),
    }
}

fn run_compress(
    session: &mut Compress,
    input: &[u8],
    output: &mut [u8],
    flush: FlushCompress,
) -> CodecStep {
    let (before_in, before_out) = (session.total_in(), session.total_out());
    let result = session.compress(input, output, flush);
    let consumed = (session.total_in() - before_in) as usize;
    let produced = (session.total_out() - before_out) as usize;

    match result {
        Ok(flate2::Status::StreamEnd) => {
            CodecStep::new(consumed, produced, Status::Ok).finish()
        }
        Ok(flate2::Status::Ok) => CodecStep::new(consumed, produced, Status::Ok),
        Ok(flate2::Status::BufError) => {
            CodecStep::new(consumed, produced, stalled(output.len(), produced))
        }
        Err(e) => {
            trace!("deflate: compress failed: {}", e);
            CodecStep::new(consumed, produced, Status::Unknown(Z_STREAM_ERROR))
        }
    }
}

/// Names what a call that could not progress was waiting for.
fn stalled(output_len: usize, produced: usize) -> Status {
    if produced == output_len {
        Status::NeedMoreOutput
    } else {
        Status::EndOfInput
    }
}

impl Engine for Deflate {
    type Compressor = Compress;
    type Decompressor = Decompress;

    fn new_compressor(&self, level: Level) -> Result<Self::Compressor, Error> {
        Ok(Compress::new(compression_for(level), self.zlib_header()))
    }

    fn new_decompressor(&self) -> Result<Self::Decompressor, Error> {
        Ok(Decompress::new(self.zlib_header()))
    }

    fn reset_compressor(&self, session: &mut Self::Compressor) {
        session.reset();
    }

    fn reset_decompressor(&self, session: &mut Self::Decompressor) {
        session.reset(self.zlib_header());
    }

    fn compress_bound(&self, len: usize) -> usize {
        // Stored blocks cost 5 bytes per 64 KiB; the slack covers block
        // headers, the final empty block and zlib framing.
        len + (len >> 10) + 64
    }

    fn stateless_compress(
        &self,
        session: &mut Self::Compressor,
        input: &[u8],
        output: &mut [u8],
    ) -> CodecStep {
        self.reset_compressor(session);
        let step = run_compress(session, input, output, FlushCompress::Finish);
        if step.status.is_clean() && !step.finished {
            return CodecStep::new(step.consumed, step.produced, Status::Overflow);
        }
        step
    }

    fn compress(
        &self,
        session: &mut Self::Compressor,
        input: &[u8],
        output: &mut [u8],
        end_of_stream: bool,
    ) -> CodecStep {
        let flush = if end_of_stream {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };
        run_compress(session, input, output, flush)
    }

    fn decompress(
        &self,
        session: &mut Self::Decompressor,
        input: &[u8],
        output: &mut [u8],
    ) -> CodecStep {
        let (before_in, before_out) = (session.total_in(), session.total_out());
        let result = session.decompress(input, output, FlushDecompress::None);
        let consumed = (session.total_in() - before_in) as usize;
        let produced = (session.total_out() - before_out) as usize;

        match result {
            Ok(flate2::Status::StreamEnd) => {
                CodecStep::new(consumed, produced, Status::Ok).finish()
            }
            Ok(flate2::Status::Ok) => CodecStep::new(consumed, produced, Status::Ok),
            Ok(flate2::Status::BufError) => {
                CodecStep::new(consumed, produced, stalled(output.len(), produced))
            }
            Err(e) => {
                trace!("deflate: decompress failed: {}", e);
                CodecStep::new(consumed, produced, Status::Unknown(Z_DATA_ERROR))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn hello() -> &'static [u8] {
        b"Hello World\n"
    }

    #[test]
    fn test_stateless_compress_is_standard_deflate() {
        let engine = Deflate::load().unwrap();
        let mut session = engine.new_compressor(Level::default()).unwrap();
        let mut out = vec![0u8; 1024];

        let step = engine.stateless_compress(&mut session, hello(), &mut out);
        assert_eq!(step.status, Status::Ok);
        assert!(step.finished);
        assert_eq!(step.consumed, hello().len());

        let mut decoded = Vec::new();
        flate2::read::DeflateDecoder::new(&out[..step.produced])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, hello());
    }

    #[test]
    fn test_stateless_compress_overflow() {
        let engine = Deflate::load().unwrap();
        let mut session = engine.new_compressor(Level::default()).unwrap();
        let data: Vec<u8> = (0..4096u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let mut out = vec![0u8; 16];

        let step = engine.stateless_compress(&mut session, &data, &mut out);
        assert_eq!(step.status, Status::Overflow);
    }

    #[test]
    fn test_compress_bound_covers_incompressible_input() {
        let engine = Deflate::with_framing(Framing::Zlib).unwrap();
        let mut state = 0x2545_f491_u32;
        let data: Vec<u8> = (0..100_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect();

        for level in Level::all() {
            let mut session = engine.new_compressor(level).unwrap();
            let mut out = vec![0u8; engine.compress_bound(data.len())];
            let step = engine.stateless_compress(&mut session, &data, &mut out);
            assert_eq!(step.status, Status::Ok, "level {}", level.get());
            assert!(step.finished);
        }
    }

    #[test]
    fn test_decompress_reports_stream_end() {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(hello()).unwrap();
        let compressed = encoder.finish().unwrap();

        let engine = Deflate::with_framing(Framing::Zlib).unwrap();
        let mut session = engine.new_decompressor().unwrap();
        let mut out = vec![0u8; 64];
        let step = engine.decompress(&mut session, &compressed, &mut out);

        assert!(step.finished);
        assert_eq!(step.consumed, compressed.len());
        assert_eq!(&out[..step.produced], hello());
    }

    #[test]
    fn test_decompress_garbage_is_data_error() {
        let engine = Deflate::with_framing(Framing::Zlib).unwrap();
        let mut session = engine.new_decompressor().unwrap();
        let mut out = vec![0u8; 64];
        let step = engine.decompress(&mut session, b"definitely not zlib", &mut out);
        assert_eq!(step.status, Status::Unknown(Z_DATA_ERROR));
    }

    #[test]
    fn test_reset_allows_second_stream() {
        let engine = Deflate::load().unwrap();
        let mut session = engine.new_compressor(Level::BEST).unwrap();
        let mut out = vec![0u8; 256];

        let first = engine.stateless_compress(&mut session, hello(), &mut out);
        let first = out[..first.produced].to_vec();
        let second = engine.stateless_compress(&mut session, hello(), &mut out);
        assert_eq!(first, &out[..second.produced]);
    }
}
