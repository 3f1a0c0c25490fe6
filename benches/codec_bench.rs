//! Codec benchmarks
//!
//! Measures OSC encode/decode throughput for typical control messages.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use osclink::protocol::{decode, encode, OscArg, OscMessage};

fn bench_encode(c: &mut Criterion) {
    let msg = OscMessage::new(
        "/live/device/set/parameter/value",
        vec![
            OscArg::Int(0),
            OscArg::Int(2),
            OscArg::Int(7),
            OscArg::Float(0.4375),
        ],
    );

    c.bench_function("encode_param_set", |b| {
        b.iter(|| encode(black_box(&msg)));
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = encode(&OscMessage::new(
        "/live/device/get/parameter/value_string",
        vec![
            OscArg::Int(0),
            OscArg::Int(2),
            OscArg::Int(7),
            OscArg::Str("1.2 kHz".to_string()),
        ],
    ));

    c.bench_function("decode_display_reply", |b| {
        b.iter(|| decode(black_box(&bytes)));
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
