#![no_main]

use libfuzzer_sys::fuzz_target;
use streamflate::{Decoder, DecoderConfig};

fuzz_target!(|data: &[u8]| {
    // Small chunks and thresholds reach the direct and buffered paths
    let configs = [
        DecoderConfig::default(),
        DecoderConfig::new(16, 7, 64).unwrap(),
    ];

    for config in configs {
        for buf_size in [1usize, 15, 4096] {
            let mut decoder = Decoder::with_config(data, config).unwrap();
            let mut buf = vec![0u8; buf_size];
            let mut produced = 0usize;

            loop {
                match decoder.decode(&mut buf) {
                    Ok(status) => {
                        assert!(status.written <= buf.len());
                        produced += status.written;
                        if status.end_of_stream {
                            break;
                        }
                    }
                    Err(err) => {
                        // Codec failures stick to the session
                        assert!(err.is_terminal());
                        assert!(decoder.decode(&mut buf).is_err());
                        break;
                    }
                }

                // Bomb guard
                if produced > 64 * 1024 * 1024 {
                    break;
                }
            }
        }
    }
});
