//! Property-based tests for the frame container.
//!
//! Randomized inputs, write chunkings, and corruptions, checking that frames
//! round-trip and that damaged frames fail cleanly instead of panicking.

use std::io::Write;

use lz4frame_codecs::{compress_frame, compress_session, decompress_session, Lz4Decompressor};
use lz4frame_core::{FrameOptions, FrameReader, FrameWriter, SizeClass};
use proptest::prelude::*;

fn options_strategy() -> impl Strategy<Value = FrameOptions> {
    (
        -4i32..=12,
        prop_oneof![Just(SizeClass::Max64KB), Just(SizeClass::Max256KB)],
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(level, size_class, bc, cc)| {
            FrameOptions::new(level, size_class)
                .with_block_checksum(bc)
                .with_content_checksum(cc)
        })
}

/// Mostly-repetitive data so both compressed and raw blocks show up.
fn data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..2000),
        (prop::collection::vec(any::<u8>(), 1..40), 0usize..150_000).prop_map(|(pattern, len)| {
            pattern.iter().cycle().take(len).copied().collect::<Vec<u8>>()
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_writer_reader_round_trip(
        data in data_strategy(),
        options in options_strategy(),
        chunk in 1usize..70_000,
    ) {
        let mut writer = FrameWriter::new(Vec::new(), compress_session(&options)).unwrap();
        for piece in data.chunks(chunk) {
            writer.write_all(piece).unwrap();
        }
        let wire = writer.finish().unwrap();

        let reader = FrameReader::new(wire.as_slice(), Lz4Decompressor).unwrap();
        prop_assert_eq!(reader.descriptor(), options.descriptor());
        let back = reader.decompress_to_end().unwrap();
        prop_assert!(back == data);
    }

    #[test]
    fn test_block_lengths_never_exceed_block_size(
        data in data_strategy(),
        options in options_strategy(),
    ) {
        let mut session = compress_session(&options);
        let mut dest = Vec::new();
        for chunk in data.chunks(session.block_size()) {
            dest.clear();
            let n = session.compress_block_into(chunk, &mut dest).unwrap();
            prop_assert_eq!(n, dest.len());
            let field = u32::from_le_bytes(dest[..4].try_into().unwrap());
            prop_assert!(field != 0);
            prop_assert!((field & 0x7fff_ffff) as usize <= session.block_size());
            prop_assert!((field & 0x7fff_ffff) as usize <= chunk.len());
        }
    }

    #[test]
    fn test_corrupted_frames_never_panic(
        data in prop::collection::vec(any::<u8>(), 0..5000),
        bc in any::<bool>(),
        flips in prop::collection::vec((any::<prop::sample::Index>(), 0u8..8), 1..4),
    ) {
        let options = FrameOptions::default().with_block_checksum(bc);
        let mut wire = compress_frame(&data, &options).unwrap();
        // Keep the descriptor intact so decoding actually starts.
        for (index, bit) in flips {
            let pos = 7 + index.index(wire.len() - 7);
            wire[pos] ^= 1 << bit;
        }
        let reader = FrameReader::new(wire.as_slice(), Lz4Decompressor).unwrap();
        let _ = reader.decompress_to_end();
    }

    #[test]
    fn test_random_headers_only_match_table(header in prop::array::uniform7(any::<u8>())) {
        let known = lz4frame_core::FrameDescriptor::all().any(|d| d.bytes() == &header);
        prop_assert_eq!(decompress_session(&header).is_ok(), known);
    }
}
