//! Benchmarks for the transport's jitter-buffer resequencer.
//!
//! Run with: cargo bench --bench resequencer
//!
//! `Resequencer` is an internal type, so it's exercised through the
//! `__internal` re-export rather than a dedicated public API, matching the
//! teacher's note that internal components are benchmarked the same way.

use std::hint::black_box;

use brawlback::__internal::Resequencer;
use brawlback::Frame;
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_in_order_delivery(c: &mut Criterion) {
    c.bench_function("resequencer in-order stream", |b| {
        b.iter(|| {
            let mut seq = Resequencer::new(2);
            for f in 0..1000u32 {
                black_box(seq.on_datagram(Frame::new(f as i32), f));
            }
        });
    });
}

fn bench_with_small_gaps(c: &mut Criterion) {
    c.bench_function("resequencer with concealed gaps", |b| {
        b.iter(|| {
            let mut seq = Resequencer::new(2);
            for f in 0..1000u32 {
                // Drop every third datagram to exercise packet-loss concealment.
                if f % 3 != 0 {
                    black_box(seq.on_datagram(Frame::new(f as i32), f));
                }
            }
        });
    });
}

fn bench_out_of_order_arrivals(c: &mut Criterion) {
    c.bench_function("resequencer out-of-order arrivals", |b| {
        b.iter(|| {
            let mut seq = Resequencer::new(4);
            for chunk_start in (0..1000u32).step_by(2) {
                black_box(seq.on_datagram(Frame::new(chunk_start as i32 + 1), chunk_start + 1));
                black_box(seq.on_datagram(Frame::new(chunk_start as i32), chunk_start));
            }
        });
    });
}

criterion_group!(benches, bench_in_order_delivery, bench_with_small_gaps, bench_out_of_order_arrivals);
criterion_main!(benches);
