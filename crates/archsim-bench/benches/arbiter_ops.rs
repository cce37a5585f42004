//! Criterion micro-benchmarks for arbitration and channel stepping.

use std::hint::black_box;

use archsim_bench::contention_profile;
use archsim_channel::{Channel, ChannelConfig, TransferMode, TransferRequest};
use archsim_core::{BufferId, TickId};
use archsim_engine::ArbiterMode;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

fn bench_settle(c: &mut Criterion) {
    for (name, mode) in [
        ("shared", ArbiterMode::Shared),
        ("scheduled", ArbiterMode::Scheduled),
    ] {
        c.bench_function(&format!("settle_{name}_64x4k"), |b| {
            b.iter_batched(
                || contention_profile(mode, 64, 4096).unwrap(),
                |mut sim| {
                    sim.run_until_quiescent(1_000_000).unwrap();
                    black_box(sim.metrics().ticks)
                },
                BatchSize::SmallInput,
            );
        });
    }
}

fn bench_interleaved_advance(c: &mut Criterion) {
    c.bench_function("channel_advance_interleaved_256", |b| {
        b.iter_batched(
            || {
                let mut ch = Channel::new(
                    "bus",
                    ChannelConfig {
                        transfer_mode: TransferMode::Interleaving,
                        ..ChannelConfig::default()
                    },
                )
                .unwrap();
                for i in 0..256 {
                    ch.begin_transfer(
                        TickId(0),
                        TransferRequest {
                            requester: "pe".into(),
                            buffer: BufferId(i),
                            size: 1024 + i,
                        },
                    )
                    .unwrap();
                }
                ch
            },
            |mut ch| {
                let mut t = 0;
                while !ch.is_idle() {
                    black_box(ch.advance(TickId(t)));
                    t += 1;
                }
                black_box(ch.expectations().len())
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_settle, bench_interleaved_advance);
criterion_main!(benches);
