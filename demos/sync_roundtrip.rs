//! File compression round trip example.
//!
//! Compresses a file into memory at every level, then decompresses it again
//! with a tiny and a large read buffer.
//!
//! Run with:
//!     cargo run --example sync_roundtrip -- /path/to/file

use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::time::Instant;

use streamflate::{Decoder, Encoder, Level};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "Cargo.toml".to_string());

    println!("Compressing file: {}\n", path);

    let mut data = Vec::new();
    File::open(&path)?.read_to_end(&mut data)?;
    println!("File size: {} bytes\n", data.len());

    for level in Level::all() {
        let start = Instant::now();
        let mut encoder = Encoder::with_level(Vec::new(), level)?;
        io::copy(&mut &data[..], &mut encoder)?;
        encoder.close()?;
        let compressed = encoder.into_inner();
        let elapsed = start.elapsed();

        println!(
            "Level {}: {:>10} bytes ({:>5.1}%) in {:?}",
            level.get(),
            compressed.len(),
            100.0 * compressed.len() as f64 / data.len().max(1) as f64,
            elapsed
        );

        for buf_size in [16usize, 256 * 1024] {
            let mut decoder = Decoder::new(&compressed[..])?;
            let mut buf = vec![0u8; buf_size];
            let mut restored = Vec::with_capacity(data.len());
            loop {
                let status = decoder.decode(&mut buf)?;
                restored.extend_from_slice(&buf[..status.written]);
                if status.end_of_stream {
                    break;
                }
            }
            decoder.close()?;

            assert_eq!(restored, data, "round trip mismatch");
            println!("    decoded with {:>7} byte reads: ok", buf_size);
        }
    }

    Ok(())
}
