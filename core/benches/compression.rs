// core/benches/compression.rs
use std::io::Write;
use std::sync::Arc;

use compress_core::compression::codecs::NoopCodec;
use compress_core::compression::{Codec, CodecRegistry};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZES: [usize; 4] = [1024, 4096, 8192, 16384];

/// Low-entropy bytes so every codec has something to squeeze.
fn payload(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..len).map(|_| rng.gen_range(b'a'..=b'h')).collect()
}

fn codecs() -> Vec<Arc<dyn Codec>> {
    let registry = CodecRegistry::with_defaults().expect("built-in codecs");
    let mut codecs: Vec<Arc<dyn Codec>> = vec![Arc::new(NoopCodec::new())];
    codecs.extend(registry.codes().into_iter().map(|code| registry.lookup(code).expect("lookup")));
    codecs
}

fn bench_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer");
    for codec in codecs() {
        for size in SIZES {
            let data = payload(size);
            let mut sink = Vec::with_capacity(size * 2);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::new(codec.name(), size), &data, |b, data| {
                b.iter(|| {
                    sink.clear();
                    let mut writer = codec.new_writer(Box::new(&mut sink)).unwrap();
                    writer.write_all(black_box(data)).unwrap();
                    writer.close().unwrap();
                });
            });
        }
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for codec in codecs() {
        for size in SIZES {
            let wire = codec.encode(&payload(size)).unwrap();
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::new(codec.name(), size), &wire, |b, wire| {
                b.iter(|| codec.decode(black_box(wire)).unwrap());
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_writer, bench_decode);
criterion_main!(benches);
