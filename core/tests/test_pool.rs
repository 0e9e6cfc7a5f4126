#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::sync::Arc;
    use std::thread;

    use compress_core::compression::codecs::{GzipCodec, Lz4Codec, SnappyCodec, ZstdCodec};
    use compress_core::compression::{Codec, CodecRegistry};

    fn roundtrip(codec: &dyn Codec, payload: &[u8]) -> Vec<u8> {
        let mut wire = Vec::new();
        {
            let mut writer = codec.new_writer(Box::new(&mut wire)).expect("writer");
            writer.write_all(payload).expect("write");
            writer.close().expect("close");
        }
        let mut reader = codec.new_reader(Box::new(&wire[..])).expect("reader");
        let mut plain = Vec::new();
        reader.read_to_end(&mut plain).expect("read");
        reader.close().expect("close");
        plain
    }

    #[test]
    fn back_to_back_streams_share_one_engine_without_leaking_state() {
        let registry = CodecRegistry::with_defaults().expect("defaults");
        for code in registry.codes() {
            let codec = registry.lookup(code).expect("lookup");
            assert_eq!(roundtrip(codec.as_ref(), b"the first payload, rather long"), b"the first payload, rather long");
            assert_eq!(roundtrip(codec.as_ref(), b"second"), b"second", "codec {}", codec.name());
        }
    }

    #[test]
    fn second_stream_reuses_the_pooled_engine() {
        let codec = GzipCodec::new();
        roundtrip(&codec, b"one");
        roundtrip(&codec, b"two");

        let writers = codec.pools().writer_stats();
        assert_eq!(writers.created, 1);
        assert_eq!(writers.reused, 1);
        assert_eq!(writers.idle, 1);

        let readers = codec.pools().reader_stats();
        assert_eq!(readers.created, 1);
        assert_eq!(readers.reused, 1);
    }

    #[test]
    fn double_close_returns_engine_once() {
        let codec = ZstdCodec::new();
        let mut writer = codec.new_writer(Box::new(Vec::new())).expect("writer");
        writer.write_all(b"close me twice").expect("write");
        writer.close().expect("first close");
        writer.close().expect("second close is a no-op");
        drop(writer);

        let stats = codec.pools().writer_stats();
        assert_eq!(stats.released, 1);
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.in_flight(), 0);

        let wire = codec.encode(b"x").expect("encode");
        let mut reader = codec.new_reader(Box::new(&wire[..])).expect("reader");
        reader.close().expect("first close");
        reader.close().expect("second close");
        assert_eq!(codec.pools().reader_stats().released, 1);
    }

    #[test]
    fn abandoned_reader_mid_stream_does_not_poison_next_reader() {
        let codec = Lz4Codec::new();
        let first = codec.encode(&vec![b'a'; 100_000]).expect("encode");
        let second = codec.encode(b"clean").expect("encode");

        {
            let mut reader = codec.reader(&first[..]).expect("reader");
            let mut partial = [0u8; 10];
            reader.read_exact(&mut partial).expect("partial read");
        }

        let mut reader = codec.reader(&second[..]).expect("reader");
        let mut plain = Vec::new();
        reader.read_to_end(&mut plain).expect("read");
        assert_eq!(plain, b"clean");
        assert_eq!(codec.pools().reader_stats().reused, 1);
    }

    #[test]
    fn leaked_stream_only_shrinks_pool() {
        let codec = SnappyCodec::new();
        let writer = codec.writer(Vec::new()).expect("writer");
        std::mem::forget(writer);

        let wire = codec.encode(b"still works").expect("encode");
        assert_eq!(codec.decode(&wire).expect("decode"), b"still works");
        let stats = codec.pools().writer_stats();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.in_flight(), 1);
    }

    #[test]
    fn concurrent_streams_never_share_an_engine() {
        let codec: Arc<dyn Codec> = Arc::new(GzipCodec::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let codec = Arc::clone(&codec);
                thread::spawn(move || {
                    for i in 0..50 {
                        let payload = format!("thread {t} iteration {i} {}", "x".repeat(i * 7));
                        assert_eq!(roundtrip(codec.as_ref(), payload.as_bytes()), payload.as_bytes());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }
    }
}
