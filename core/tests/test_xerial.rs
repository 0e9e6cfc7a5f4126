#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use compress_core::compression::codecs::xerial::{self, XerialChunks};
    use compress_core::compression::codecs::SnappyCodec;
    use compress_core::compression::constants::{XERIAL_HEADER, XERIAL_HEADER_LEN};
    use compress_core::compression::{Codec, CodecError};
    use proptest::prelude::*;

    fn frame(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = XERIAL_HEADER.to_vec();
        for payload in payloads {
            let block = snap::raw::Encoder::new().compress_vec(payload).expect("snap encode");
            out.extend_from_slice(&(block.len() as u32).to_be_bytes());
            out.extend_from_slice(&block);
        }
        out
    }

    #[test]
    fn foo_bar_baz_frame_decodes_to_concatenation() {
        let wire = frame(&[b"foo", b"bar", b"baz"]);
        assert_eq!(xerial::decode(&wire).expect("decode"), b"foobarbaz");

        let codec = SnappyCodec::new();
        assert_eq!(codec.decode(&wire).expect("codec decode"), b"foobarbaz");

        let mut reader = codec.new_reader(Box::new(&wire[..])).expect("reader");
        let mut plain = Vec::new();
        reader.read_to_end(&mut plain).expect("read");
        assert_eq!(plain, b"foobarbaz");
    }

    #[test]
    fn unframed_input_is_one_raw_block() {
        let block = snap::raw::Encoder::new().compress_vec(b"plain snappy block").expect("snap encode");
        assert!(!xerial::is_xerial_header(&block));
        assert_eq!(
            xerial::decode(&block).expect("decode"),
            snap::raw::Decoder::new().decompress_vec(&block).expect("snap decode")
        );
    }

    #[test]
    fn partial_header_falls_back_to_raw_decode() {
        // Fifteen header bytes is not a frame; it must be read as a raw block and fail as one.
        let err = xerial::decode(&XERIAL_HEADER[..15]).expect_err("not a valid raw block");
        assert!(matches!(err, CodecError::CodecProcessFailed { codec: "snappy", .. }));
    }

    #[test]
    fn length_past_end_is_corrupt_frame() {
        let mut wire = frame(&[b"ok"]);
        let second = wire.len();
        wire.extend_from_slice(&1_000u32.to_be_bytes());
        wire.extend_from_slice(b"tiny");

        match xerial::decode(&wire) {
            Err(CodecError::CorruptFrame { offset, .. }) => assert_eq!(offset, second),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn truncated_length_prefix_is_corrupt_frame() {
        let mut wire = frame(&[b"ok"]);
        wire.extend_from_slice(&[0, 0]);
        assert!(matches!(xerial::decode(&wire), Err(CodecError::CorruptFrame { .. })));
    }

    #[test]
    fn corrupt_frame_through_reader_is_invalid_data() {
        let mut wire = XERIAL_HEADER.to_vec();
        wire.extend_from_slice(&u32::MAX.to_be_bytes());

        let codec = SnappyCodec::new();
        let mut reader = codec.new_reader(Box::new(&wire[..])).expect("reader");
        let err = reader.read_to_end(&mut Vec::new()).expect_err("corrupt");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert!(matches!(CodecError::from(err), CodecError::CorruptFrame { offset: XERIAL_HEADER_LEN, .. }));
    }

    #[test]
    fn chunk_iterator_stops_after_error() {
        let mut wire = frame(&[b"a"]);
        wire.extend_from_slice(&[0xff; 3]);
        let items: Vec<_> = XerialChunks::new(&wire).expect("framed").collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn framed_writer_output_is_readable_by_any_snappy_codec() {
        let framed = SnappyCodec::framed(4).expect("valid block size");
        let mut writer = framed.writer(Vec::new()).expect("writer");
        writer.write_all(b"split into four byte chunks").expect("write");
        let wire = writer.finish().expect("finish");

        let chunks = XerialChunks::new(&wire).expect("framed").count();
        assert_eq!(chunks, "split into four byte chunks".len().div_ceil(4));
        assert_eq!(SnappyCodec::new().decode(&wire).expect("decode"), b"split into four byte chunks");
    }

    proptest! {
        #[test]
        fn prop_frame_decodes_to_concatenation(parts in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..512), 0..8)) {
            let refs: Vec<&[u8]> = parts.iter().map(Vec::as_slice).collect();
            let expected: Vec<u8> = parts.concat();
            prop_assert_eq!(xerial::decode(&frame(&refs)).unwrap(), expected);
        }

        #[test]
        fn prop_garbage_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut wire = XERIAL_HEADER.to_vec();
            wire.extend_from_slice(&bytes);
            let _ = xerial::decode(&wire);
            let _ = xerial::decode(&bytes);
        }
    }
}
