#[cfg(test)]
mod pool_snapshot_tests {
    use std::io::Write;

    use compress_core::compression::codecs::Lz4Codec;
    use compress_core::telemetry::{PoolCounters, PoolSnapshot};

    #[test]
    fn counters_feed_snapshot() {
        let counters = PoolCounters::default();
        counters.add_created();
        counters.add_created();
        counters.add_reused();
        counters.add_released();
        counters.add_discarded();

        let snapshot = counters.snapshot(1);
        assert_eq!(snapshot.acquired(), 3);
        assert_eq!(snapshot.in_flight(), 1);
        assert!((snapshot.reuse_ratio() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_snapshot_has_zero_reuse() {
        assert_eq!(PoolSnapshot::default().reuse_ratio(), 0.0);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let codec = Lz4Codec::new();
        let mut writer = codec.writer(Vec::new()).expect("writer");
        writer.write_all(b"counted").expect("write");
        writer.finish().expect("finish");

        let json = serde_json::to_value(codec.pools().writer_stats()).expect("serialize");
        assert_eq!(json["created"], 1);
        assert_eq!(json["released"], 1);
        assert_eq!(json["idle"], 1);

        let back: PoolSnapshot = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, codec.pools().writer_stats());
    }
}
