//! Approximations of π built on top of the reducer.
//!
//! Both estimators split their work across `partitions` workers and are useful as realistic,
//! compute-bound workloads for exercising the reducer.

use std::convert::Infallible;
use std::num::NonZero;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::reducer::with_partitions;
use crate::{Error, reduce};

/// Approximates π with the midpoint rule applied to `4 / (1 + x²)` over `[0, 1]`.
///
/// The interval is divided into `steps` equally wide slices. Each slice is evaluated at its
/// midpoint and the slices are summed in parallel.
///
/// # Errors
///
/// Returns [`Error::InvalidPartition`] if `partitions` is zero or exceeds `steps`, and any other
/// error [`reduce()`] can return.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
///
/// let pi = par_reduce::pi::midpoint(nz!(1_000_000), 8).unwrap();
///
/// assert!((pi - std::f64::consts::PI).abs() < 1e-3);
/// ```
#[expect(
    clippy::cast_precision_loss,
    reason = "step counts beyond 2^52 are not a realistic use case"
)]
pub fn midpoint(steps: NonZero<usize>, partitions: usize) -> Result<f64, Error> {
    let steps = steps.get();
    let width = 1.0 / steps as f64;

    let quarter = reduce(
        steps,
        partitions,
        |i| {
            let x = (i as f64 + 0.5) * width;
            1.0 / x.mul_add(x, 1.0)
        },
        |a, b| a + b,
        0.0,
    )?;

    Ok(4.0 * quarter * width)
}

/// Approximates π by sampling `samples` random points in the unit square and counting the
/// fraction that lands inside the quarter circle of radius 1.
///
/// Each partition draws from its own random number generator, seeded from the start of its
/// work range. The result is therefore deterministic for a given `(samples, partitions)` pair.
///
/// # Errors
///
/// Returns [`Error::InvalidPartition`] if `partitions` is zero or exceeds `samples`, and any
/// other error [`Reducer::try_reduce_partitions()`][crate::Reducer::try_reduce_partitions] can
/// return.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
///
/// let pi = par_reduce::pi::monte_carlo(nz!(100_000), 4).unwrap();
///
/// assert!((pi - std::f64::consts::PI).abs() < 0.05);
/// ```
#[expect(
    clippy::cast_precision_loss,
    reason = "sample counts beyond 2^52 are not a realistic use case"
)]
pub fn monte_carlo(samples: NonZero<usize>, partitions: usize) -> Result<f64, Error> {
    let samples = samples.get();

    let hits = with_partitions(samples, partitions)?.try_reduce_partitions(
        samples,
        |range| {
            let mut rng = StdRng::seed_from_u64(range.start() as u64);

            let hits = range
                .indexes()
                .filter(|_| {
                    let x: f64 = rng.random();
                    let y: f64 = rng.random();
                    x.mul_add(x, y * y) <= 1.0
                })
                .count();

            Ok::<_, Infallible>(hits)
        },
        |a, b| a + b,
        0_usize,
    )?;

    Ok(4.0 * hits as f64 / samples as f64)
}
