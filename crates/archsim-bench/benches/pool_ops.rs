//! Criterion micro-benchmarks for buffer pool operations.

use std::hint::black_box;

use archsim_core::{BufferState, MemoryId};
use archsim_pool::{BufferPool, PoolConfig, Trigger, TriggerDescriptor};
use archsim_semaphore::{SemaphoreStation, StationConfig};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_lifecycle(c: &mut Criterion) {
    let src = MemoryId::from("dram");
    let dst = MemoryId::from("sram");
    c.bench_function("pool_create_transfer_consume_4k", |b| {
        let mut pool = BufferPool::new(PoolConfig::with_seed(1));
        b.iter(|| {
            let id = pool.create(4096, None, Some(src.clone())).unwrap();
            pool.add_trigger(id, Trigger::signal(BufferState::Arrived, "sem", 0))
                .unwrap();
            pool.transfer(id, dst.clone()).unwrap();
            pool.consume(id).unwrap();
            black_box(pool.take_fired());
            pool.purge_deallocated();
        });
    });
}

fn bench_descriptor_parse(c: &mut Criterion) {
    let json = r#"{"on": "arrived", "action": "signal", "station": "sem", "index": 3}"#;
    c.bench_function("trigger_descriptor_parse", |b| {
        b.iter(|| black_box(TriggerDescriptor::parse(black_box(json)).unwrap()));
    });
}

fn bench_semaphore(c: &mut Criterion) {
    c.bench_function("semaphore_wait_signal_1k", |b| {
        let mut station = SemaphoreStation::new("sem", StationConfig::default()).unwrap();
        b.iter(|| {
            for i in 0..1000usize {
                station.wait("c".into(), i % 32).unwrap();
            }
            for i in 0..1000usize {
                black_box(station.signal(i % 32).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_lifecycle, bench_descriptor_parse, bench_semaphore);
criterion_main!(benches);
