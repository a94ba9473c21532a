//! Criterion benchmarks for circuit discovery on ladder layouts.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use interlock_bench::ladder_profile;
use interlock_test_utils::assert_consistent;

fn bench_recalculate_20(c: &mut Criterion) {
    let mut p = ladder_profile(20, true).unwrap();
    c.bench_function("recalculate_ladder_20", |b| {
        b.iter(|| {
            p.net.calculate_connections();
            black_box(p.net.drain_events());
        });
    });
    assert_consistent(&p.net);
}

fn bench_recalculate_50(c: &mut Criterion) {
    let mut p = ladder_profile(50, true).unwrap();
    c.bench_function("recalculate_ladder_50", |b| {
        b.iter(|| {
            p.net.calculate_connections();
            black_box(p.net.drain_events());
        });
    });
}

fn bench_toggle_middle_rung(c: &mut Criterion) {
    let mut p = ladder_profile(50, true).unwrap();
    let sw = p.switches[25];
    c.bench_function("toggle_rung_ladder_50", |b| {
        b.iter(|| {
            p.net.set_switch(sw, false).unwrap();
            p.net.set_switch(sw, true).unwrap();
            black_box(p.net.drain_events());
        });
    });
    assert_consistent(&p.net);
}

fn bench_build_and_seed(c: &mut Criterion) {
    c.bench_function("build_ladder_20", |b| {
        b.iter(|| {
            let p = ladder_profile(20, true).unwrap();
            black_box(p.net.stats());
        });
    });
}

criterion_group!(
    benches,
    bench_recalculate_20,
    bench_recalculate_50,
    bench_toggle_middle_rung,
    bench_build_and_seed
);
criterion_main!(benches);
