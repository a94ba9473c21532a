//! Criterion benchmarks for relay pickup and drop through the scheduler.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use interlock_bench::relay_bank_profile;

fn bench_bank_cycle_32(c: &mut Criterion) {
    let mut p = relay_bank_profile(32).unwrap();
    c.bench_function("relay_bank_cycle_32", |b| {
        b.iter(|| {
            p.net.set_source_enabled(p.source, true).unwrap();
            p.net.advance(1_000);
            p.net.set_source_enabled(p.source, false).unwrap();
            p.net.advance(1_000);
            black_box(p.net.drain_events());
        });
    });
}

fn bench_idle_advance(c: &mut Criterion) {
    let mut p = relay_bank_profile(32).unwrap();
    p.net.set_source_enabled(p.source, true).unwrap();
    p.net.advance(1_000);
    c.bench_function("idle_advance_32", |b| {
        b.iter(|| {
            p.net.advance(100);
            black_box(p.net.now());
        });
    });
}

criterion_group!(benches, bench_bank_cycle_32, bench_idle_advance);
criterion_main!(benches);
