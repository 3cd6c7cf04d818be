//! Benchmarks for the snapshot save/load/checksum codec.
//!
//! Run with: cargo bench --bench snapshot_codec

use std::hint::black_box;

use brawlback::kernel::state::SimState;
use brawlback::snapshot;
use criterion::{criterion_group, criterion_main, Criterion};

fn sample_state() -> SimState {
    let mut state = SimState::new_match("ken", "ryu", 1000.0);
    state.frame = brawlback::Frame::new(1234);
    state.p0.health = 640.0;
    state.p1.health = 210.0;
    state.p0.meter = 75.0;
    state.p1.guard_meter = 40.0;
    state
}

fn bench_save(c: &mut Criterion) {
    let state = sample_state();
    c.bench_function("snapshot::save", |b| {
        b.iter(|| black_box(snapshot::save(black_box(&state))));
    });
}

fn bench_load(c: &mut Criterion) {
    let bytes = snapshot::save(&sample_state());
    c.bench_function("snapshot::load", |b| {
        b.iter(|| black_box(snapshot::load(black_box(&bytes)).unwrap()));
    });
}

fn bench_checksum(c: &mut Criterion) {
    let bytes = snapshot::save(&sample_state());
    c.bench_function("snapshot::checksum", |b| {
        b.iter(|| black_box(snapshot::checksum(black_box(&bytes))));
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let state = sample_state();
    c.bench_function("snapshot save+load round trip", |b| {
        b.iter(|| {
            let bytes = snapshot::save(black_box(&state));
            black_box(snapshot::load(&bytes).unwrap())
        });
    });
}

criterion_group!(benches, bench_save, bench_load, bench_checksum, bench_round_trip);
criterion_main!(benches);
