use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pktstream::generator::PacketGenerator;
use pktstream::store::AggregationStore;

fn record_tick(c: &mut Criterion) {
    let mut generator = PacketGenerator::seeded(1);
    let mut store = AggregationStore::default();
    c.bench_function("record", |b| {
        b.iter(|| store.record(black_box(generator.generate_at(0))))
    });
}

fn record_and_snapshot(c: &mut Criterion) {
    let mut generator = PacketGenerator::seeded(2);
    let mut store = AggregationStore::default();
    // Warm the destination map so snapshots copy a realistic amount.
    for _ in 0..5_000 {
        store.record(generator.generate_at(0));
    }
    c.bench_function("record_and_snapshot", |b| {
        b.iter(|| {
            store.record(generator.generate_at(0));
            black_box(store.snapshot())
        })
    });
}

fn encode_frame(c: &mut Criterion) {
    let mut generator = PacketGenerator::seeded(3);
    let mut store = AggregationStore::default();
    for _ in 0..1_000 {
        store.record(generator.generate_at(0));
    }
    let snapshot = store.snapshot();
    c.bench_function("encode_frame", |b| b.iter(|| black_box(snapshot.to_json())));
}

criterion_group!(benches, record_tick, record_and_snapshot, encode_frame);
criterion_main!(benches);
