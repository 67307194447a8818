//! Control arbitration benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use telemdb_core::{Authority, TimeRange};
use telemdb_testkit::{exclusive_controller, writer, writer_on};

/// Benchmark opening and releasing a gate on an empty controller.
fn bench_open_release(c: &mut Criterion) {
    let controller = exclusive_controller();
    c.bench_function("open_release", |b| {
        b.iter(|| {
            let (gate, transfer) = controller.open_gate(writer("bench", 10)).unwrap();
            black_box(transfer);
            gate.release();
        });
    });
}

/// Benchmark authorization on a region with many competing gates.
fn bench_authorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("authorize");

    for gates in [1usize, 10, 100].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(gates), gates, |b, &gates| {
            let controller = exclusive_controller();
            let (leader, _) = controller.open_gate(writer("leader", 200)).unwrap();
            let _followers: Vec<_> = (0..gates)
                .map(|i| controller.open_gate(writer(&format!("f{i}"), 1)).unwrap().0)
                .collect();

            b.iter(|| {
                black_box(leader.authorize().unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark handing control back and forth by changing authority.
fn bench_set_authority(c: &mut Criterion) {
    let controller = exclusive_controller();
    let (g1, _) = controller.open_gate(writer("g1", 10)).unwrap();
    let (_g2, _) = controller.open_gate(writer("g2", 10)).unwrap();
    let mut high = false;

    c.bench_function("set_authority_handoff", |b| {
        b.iter(|| {
            high = !high;
            let authority = if high { Authority::new(5) } else { Authority::new(10) };
            black_box(g1.set_authority(authority));
        });
    });
}

/// Benchmark opening a gate when the directory holds many regions.
fn bench_open_many_regions(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_many_regions");

    for regions in [10i64, 100, 1000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(regions),
            regions,
            |b, &regions| {
                let controller = exclusive_controller();
                let _held: Vec<_> = (0..regions)
                    .map(|i| {
                        controller
                            .open_gate(writer_on(&format!("r{i}"), TimeRange::from_seconds(i, i + 1), 1))
                            .unwrap()
                            .0
                    })
                    .collect();
                let target = TimeRange::from_seconds(regions / 2, regions / 2 + 1);

                b.iter(|| {
                    let (gate, _) = controller.open_gate(writer_on("probe", target, 2)).unwrap();
                    gate.release();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_open_release,
    bench_authorize,
    bench_set_authority,
    bench_open_many_regions,
);
criterion_main!(benches);
