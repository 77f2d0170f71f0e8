//! Async decompression example.
//!
//! Streams compressed bytes through a tokio duplex pipe and decodes them on
//! the other end with `decode_async`.
//!
//! Run with:
//!     cargo run --example async_decode --features async-io

use futures_util::StreamExt;
use streamflate::{Encoder, Level, decode_async};
use tokio::io::AsyncWriteExt;
use tokio_util::compat::TokioAsyncReadCompatExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data: Vec<u8> = (0..1_000_000).map(|i| (i % 251) as u8).collect();
    let compressed = Encoder::compress_bytes(&data, Level::new(2)?)?;

    println!(
        "Compressed {} bytes into {} bytes\n",
        data.len(),
        compressed.len()
    );

    let (mut writer, reader) = tokio::io::duplex(16 * 1024);

    // Simulate a network peer sending the stream in small pieces
    let producer = tokio::spawn(async move {
        for piece in compressed.chunks(4096) {
            writer.write_all(piece).await?;
        }
        writer.shutdown().await
    });

    let mut stream = decode_async(reader.compat())?;
    let mut blocks = 0;
    let mut total = 0;
    while let Some(block) = stream.next().await {
        let block = block?;
        blocks += 1;
        total += block.len();
    }
    producer.await??;

    println!("Decoded {} bytes in {} blocks", total, blocks);
    assert_eq!(total, data.len());
    Ok(())
}
