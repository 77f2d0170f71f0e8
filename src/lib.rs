//! streamflate
//!
//! Streaming DEFLATE for Rust: `Read` and `Write` adapters over a
//! block-oriented codec engine.
//!
//! Codec engines work on caller-owned slices and make bounded progress per
//! call. `streamflate` bridges them to ordinary streams:
//!
//! - a [`Decoder`] that serves any caller buffer size, decompressing large
//!   reads in place and staging small ones in a carry-over buffer
//! - an [`Encoder`] that emits one complete compressed stream per write,
//!   in a single stateless call when the result fits and chunk by chunk
//!   otherwise
//! - a shared [`BufferPool`] so sessions reuse their scratch memory
//!
//! The crate intentionally:
//! - does NOT implement a codec (it drives one through [`Engine`])
//! - does NOT manage files or paths
//! - does NOT manage concurrency beyond the thread-safe pool
//!
//! # Sync
//!
//! ```
//! use std::io::{Read, Write};
//! use streamflate::{Decoder, Encoder, Level};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut encoder = Encoder::with_level(Vec::new(), Level::new(2)?)?;
//!     encoder.write_all(b"Hello World\n")?;
//!     encoder.close()?;
//!     let compressed = encoder.into_inner();
//!
//!     let mut decoder = Decoder::new(&compressed[..])?;
//!     let mut text = String::new();
//!     decoder.read_to_string(&mut text)?;
//!     assert_eq!(text, "Hello World\n");
//!     Ok(())
//! }
//! ```
//!
//! # Async (feature = "async-io")
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
//!         println!("block {}", block.len());
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod decoder;
mod encoder;
mod engine;
mod error;

mod util; // internal io helpers

#[cfg(feature = "async-io")]
mod async_stream;

//
// Public surface
//

pub use buffer::{BufferClass, BufferPool, MAX_RETAINED_PER_CLASS, PoolStats, PooledBuffer};
pub use config::{
    CARRY_OVER_BUFFER_SIZE, COMPRESSION_INPUT_BUFFER_SIZE, DECOMPRESSION_BUFFER_SIZE,
    DEFAULT_DIRECT_THRESHOLD, DEFAULT_OUTPUT_BUFFER_SIZE, DEFAULT_STREAM_BLOCK_SIZE,
    DecoderConfig, EncoderConfig, Framing, Level, MIN_OUTPUT_BUFFER_SIZE,
};
pub use decoder::{Decoder, ReadStatus};
pub use encoder::Encoder;
pub use engine::{CodecStep, Deflate, Engine, Status};
pub use error::Error;

#[cfg(feature = "async-io")]
pub use async_stream::{AsyncDecoder, DecodeStream, decode_async, decode_async_with_config};
