//! Compares reductions of the same workload with different partition counts, from the fully
//! inline single-partition case up to one partition per processor.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::num::NonZero;

use criterion::{Criterion, criterion_group, criterion_main};
use many_cpus::SystemHardware;
use new_zealand::nz;
use par_reduce::Reducer;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const STEPS: usize = 1_000_000;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("midpoint_pi");

    let all_processors = NonZero::new(SystemHardware::current().processors().len())
        .expect("guarded by fact that ProcessorSet is never empty");

    for partitions in [nz!(1), nz!(2), nz!(4), all_processors] {
        let reducer = Reducer::builder().partitions(partitions).build();

        group.bench_function(format!("partitions_{partitions}"), |b| {
            b.iter(|| black_box(midpoint_quarter(&reducer)));
        });
    }

    group.finish();

    let mut group = c.benchmark_group("per_partition_fold");

    let reducer = Reducer::builder().partitions(all_processors).build();

    group.bench_function("sum_of_indexes", |b| {
        b.iter(|| {
            black_box(
                reducer
                    .try_reduce_partitions(
                        black_box(STEPS),
                        |range| Ok::<_, std::convert::Infallible>(range.indexes().sum::<usize>()),
                        |a, b| a.wrapping_add(b),
                        0,
                    )
                    .unwrap(),
            )
        });
    });

    group.finish();
}

#[expect(
    clippy::cast_precision_loss,
    reason = "benchmark step count is far below the precision limit"
)]
fn midpoint_quarter(reducer: &Reducer) -> f64 {
    let width = 1.0 / STEPS as f64;

    reducer
        .reduce(
            black_box(STEPS),
            |i| {
                let x = (i as f64 + 0.5) * width;
                1.0 / x.mul_add(x, 1.0)
            },
            |a, b| a + b,
            0.0,
        )
        .unwrap()
}
