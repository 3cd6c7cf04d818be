//! Benchmarks for the simulation kernel's `step` function.
//!
//! Run with: cargo bench --bench kernel_step

use std::hint::black_box;

use brawlback::input::FrameInputs;
use brawlback::kernel::moves::default_move_table;
use brawlback::kernel::state::SimState;
use brawlback::{kernel, PlayerInput};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_idle_step(c: &mut Criterion) {
    let table = default_move_table();
    c.bench_function("kernel::step idle", |b| {
        let mut state = SimState::new_match("ken", "ryu", 1000.0);
        b.iter(|| {
            state = kernel::step(black_box(state.clone()), black_box(FrameInputs::default()), &table);
        });
    });
}

fn bench_attack_step(c: &mut Criterion) {
    let table = default_move_table();
    c.bench_function("kernel::step attacking", |b| {
        let mut state = SimState::new_match("ken", "ryu", 1000.0);
        state.p1.x = 0.5;
        let inputs = FrameInputs {
            p0: PlayerInput {
                light_punch: true,
                ..Default::default()
            },
            p1: PlayerInput::default(),
        };
        b.iter(|| {
            state = kernel::step(black_box(state.clone()), black_box(inputs), &table);
        });
    });
}

fn bench_thousand_frame_match(c: &mut Criterion) {
    let table = default_move_table();
    c.bench_function("kernel::step 1000 frames alternating attacks", |b| {
        b.iter(|| {
            let mut state = SimState::new_match("ken", "ryu", 1000.0);
            for f in 0..1000u32 {
                let inputs = if f % 37 == 0 {
                    FrameInputs {
                        p0: PlayerInput {
                            medium_kick: true,
                            ..Default::default()
                        },
                        p1: PlayerInput::default(),
                    }
                } else {
                    FrameInputs::default()
                };
                state = kernel::step(black_box(state), black_box(inputs), &table);
            }
            black_box(state.frame)
        });
    });
}

criterion_group!(benches, bench_idle_step, bench_attack_step, bench_thousand_frame_match);
criterion_main!(benches);
