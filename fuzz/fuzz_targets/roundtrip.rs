#![no_main]

use std::io::Write;

use libfuzzer_sys::fuzz_target;
use streamflate::{Decoder, Encoder, EncoderConfig, Level};

fuzz_target!(|input: (u8, u16, Vec<u8>)| {
    let (level, split, data) = input;
    let level = Level::new(u32::from(level % 4)).unwrap();

    // Tiny output buffers push even short inputs onto the chunked path
    for output_buffer_size in [64usize, 1024, 128 * 1024] {
        let config = EncoderConfig::new(level).with_output_buffer_size(output_buffer_size);
        let mut encoder = Encoder::with_config(Vec::new(), config).unwrap();

        // Two writes become two stream members
        let split = usize::from(split).min(data.len());
        encoder.write_all(&data[..split]).unwrap();
        encoder.write_all(&data[split..]).unwrap();
        encoder.close().unwrap();
        let compressed = encoder.into_inner();

        for buf_size in [1usize, 1024, 65536] {
            let mut decoder = Decoder::new(&compressed[..]).unwrap();
            let mut buf = vec![0u8; buf_size];
            let mut out = Vec::with_capacity(data.len());
            loop {
                let status = decoder.decode(&mut buf).unwrap();
                out.extend_from_slice(&buf[..status.written]);
                if status.end_of_stream {
                    break;
                }
            }
            assert_eq!(out, data);
        }
    }
});
