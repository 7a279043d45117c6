use std::hint::black_box;

use aac::{AdtsHeader, AudioObjectType, build_adts_header};
use criterion::{Criterion, criterion_group, criterion_main};

fn benchmark_adts(c: &mut Criterion) {
    let mut group = c.benchmark_group("ADTS Header");

    group.bench_function("Packed Bytes", |b| {
        b.iter(|| {
            for payload_len in (0..8000).step_by(371) {
                black_box(build_adts_header(black_box(payload_len), 2, 44100, 2).unwrap());
            }
        })
    });

    let mut sink = Vec::with_capacity(64);
    group.bench_function("Bit Writer", |b| {
        b.iter(|| {
            for payload_len in (0..8000).step_by(371) {
                sink.clear();
                let header = AdtsHeader::new(payload_len, AudioObjectType::AacLowComplexity, 44100, 2).unwrap();
                header.write_to(&mut sink).unwrap();
                black_box(&sink);
            }
        })
    });

    let frame = build_adts_header(512, 2, 48000, 2).unwrap();
    group.bench_function("Parse", |b| {
        b.iter(|| {
            black_box(AdtsHeader::parse(black_box(&frame)).unwrap());
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_adts);
criterion_main!(benches);
