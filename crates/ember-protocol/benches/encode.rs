//! Envelope rendering benchmarks for ember-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ember_protocol::{codec, Frame};

fn bench_render_data(c: &mut Criterion) {
    let frame = Frame::data("chat:lobby", 123_456, "x".repeat(64));

    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("data_64B", |b| {
        b.iter(|| codec::jsonp(black_box("cb"), black_box(&frame)))
    });
    group.finish();
}

fn bench_render_backlog(c: &mut Criterion) {
    let frames: Vec<Frame> = (0..10)
        .map(|i| Frame::data("chat:lobby", i, "x".repeat(64)))
        .collect();

    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Bytes(640));
    group.bench_function("backlog_10x64B", |b| {
        b.iter(|| codec::jsonp_batch(black_box("cb"), black_box(&frames)))
    });
    group.finish();
}

criterion_group!(benches, bench_render_data, bench_render_backlog);
criterion_main!(benches);
