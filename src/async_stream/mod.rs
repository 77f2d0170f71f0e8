//! Async streaming support for decompression.
//!
//! This module provides asynchronous decompression on top of the
//! `futures-io::AsyncRead` trait, making it runtime-agnostic and compatible
//! with tokio, async-std, smol, and other async runtimes.
//!
//! - [`AsyncDecoder`] - `AsyncRead` adapter over a compressed async reader
//! - [`DecodeStream`] - Stream of decompressed [`bytes::Bytes`] blocks
//! - [`decode_async`] - Creates a [`DecodeStream`] from an async reader
//!
//! This module requires the `async-io` feature to be enabled.

mod reader;
mod stream;

pub use reader::AsyncDecoder;
pub use stream::{DecodeStream, decode_async, decode_async_with_config};
