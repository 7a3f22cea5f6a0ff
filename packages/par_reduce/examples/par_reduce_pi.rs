//! Estimates π with both estimators, once inline and once spread across all processors.

use std::num::NonZero;
use std::time::Instant;

use many_cpus::SystemHardware;
use new_zealand::nz;
use par_reduce::pi;

const STEPS: NonZero<usize> = nz!(10_000_000);

fn main() {
    let processor_count = SystemHardware::current().processors().len();

    for partitions in [1, processor_count] {
        let start = Instant::now();
        let estimate = pi::midpoint(STEPS, partitions).expect("partition count is valid");
        println!(
            "midpoint    partitions={partitions:<3} pi={estimate:.10} elapsed={:?}",
            start.elapsed()
        );

        let start = Instant::now();
        let estimate = pi::monte_carlo(STEPS, partitions).expect("partition count is valid");
        println!(
            "monte carlo partitions={partitions:<3} pi={estimate:.10} elapsed={:?}",
            start.elapsed()
        );
    }
}
