// Property-based tests for the stream adapters
// Tests cover: round trips for arbitrary data, levels, caller buffer sizes,
// output buffer sizes, write splits and framings

use std::io::{Read, Write};

use proptest::prelude::*;
use streamflate::{
    Decoder, DecoderConfig, Deflate, Encoder, EncoderConfig, Framing, Level, ReadStatus,
};

fn level() -> impl Strategy<Value = Level> {
    (0u32..=3).prop_map(|l| Level::new(l).unwrap())
}

fn decode_all<R: Read>(decoder: &mut Decoder<R>, sizes: &[usize]) -> Vec<u8> {
    let mut out = Vec::new();
    for size in sizes.iter().cycle() {
        let mut buf = vec![0u8; *size];
        let ReadStatus {
            written,
            end_of_stream,
        } = decoder.decode(&mut buf).unwrap();
        out.extend_from_slice(&buf[..written]);
        if end_of_stream {
            break;
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip_any_buffer_sizes(
        data in proptest::collection::vec(any::<u8>(), 0..20_000),
        level in level(),
        sizes in proptest::collection::vec(1usize..3000, 1..6),
    ) {
        let compressed = Encoder::compress_bytes(&data, level).unwrap();
        let mut decoder = Decoder::new(&compressed[..]).unwrap();
        prop_assert_eq!(decode_all(&mut decoder, &sizes), data);
    }

    #[test]
    fn prop_chunked_path_every_level(
        data in proptest::collection::vec(0u8..8, 1..20_000),
        level in level(),
        output_buffer_size in 64usize..2048,
        sizes in proptest::collection::vec(1usize..3000, 1..6),
    ) {
        // Any input whose bound exceeds the scratch takes the chunked path
        let config = EncoderConfig::new(level).with_output_buffer_size(output_buffer_size);
        let mut encoder = Encoder::with_config(Vec::new(), config).unwrap();
        encoder.write_all(&data).unwrap();
        let compressed = encoder.into_inner();

        let mut via_flate2 = Vec::new();
        flate2::read::DeflateDecoder::new(&compressed[..])
            .read_to_end(&mut via_flate2)
            .unwrap();
        prop_assert_eq!(&via_flate2, &data);

        let mut decoder = Decoder::new(&compressed[..]).unwrap();
        prop_assert_eq!(decode_all(&mut decoder, &sizes), data);
    }

    #[test]
    fn prop_split_writes_concatenate(
        data in proptest::collection::vec(any::<u8>(), 0..10_000),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
        output_buffer_size in 64usize..4096,
    ) {
        let mut cuts: Vec<usize> = cuts.iter().map(|c| c.index(data.len() + 1)).collect();
        cuts.sort_unstable();

        let config = EncoderConfig::default().with_output_buffer_size(output_buffer_size);
        let mut encoder = Encoder::with_config(Vec::new(), config).unwrap();
        let mut start = 0;
        for cut in cuts.into_iter().chain(std::iter::once(data.len())) {
            encoder.write_all(&data[start..cut]).unwrap();
            start = cut;
        }
        let compressed = encoder.into_inner();

        let mut decoder = Decoder::new(&compressed[..]).unwrap();
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        prop_assert_eq!(out, data);
    }

    #[test]
    fn prop_zlib_matches_flate2(
        data in proptest::collection::vec(any::<u8>(), 1..5_000),
        level in level(),
    ) {
        let engine = Deflate::with_framing(Framing::Zlib).unwrap();
        let mut encoder =
            Encoder::with_engine(Vec::new(), engine, EncoderConfig::new(level)).unwrap();
        encoder.write_all(&data).unwrap();
        let compressed = encoder.into_inner();

        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(&compressed[..]).read_to_end(&mut out).unwrap();
        prop_assert_eq!(&out, &data);

        let mut decoder =
            Decoder::with_engine(&compressed[..], engine, DecoderConfig::default()).unwrap();
        out.clear();
        decoder.read_to_end(&mut out).unwrap();
        prop_assert_eq!(out, data);
    }

    #[test]
    fn prop_arbitrary_input_never_panics(
        data in proptest::collection::vec(any::<u8>(), 0..2_000),
        size in 1usize..2048,
    ) {
        let mut decoder = Decoder::new(&data[..]).unwrap();
        let mut buf = vec![0u8; size];
        for _ in 0..64 {
            match decoder.decode(&mut buf) {
                Ok(status) if status.end_of_stream => break,
                Ok(_) => {}
                Err(err) => {
                    prop_assert!(err.is_terminal());
                    break;
                }
            }
        }
    }
}
