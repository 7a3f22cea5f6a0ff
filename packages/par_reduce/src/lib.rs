#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Fork/join parallel reduction over an index range.
//!
//! This package folds a function over every index in `[0, items)` using a fixed number of
//! workers, combining the per-worker partial results into a single value. It is the shape of
//! computation behind numerical integration, Monte Carlo estimation and similar embarrassingly
//! parallel aggregations.
//!
//! The core functionality includes:
//! - [`reduce()`] and [`try_reduce()`] - one-shot reductions with an explicit partition count
//! - [`Reducer`] - a configurable reducer with processor pinning and per-partition folds
//! - [`partition()`] - the partitioning policy, exposed for inspection and testing
//! - [`pi`] - two π estimators built on the reducer
//!
//! # Operating Principles
//!
//! ## Partitioning
//!
//! The index range is split into `P` contiguous blocks of `items / P` indexes each, with the
//! remainder appended to the last block. Every index is covered by exactly one block.
//!
//! ## Execution
//!
//! Blocks `1..P` are each folded by a dedicated worker thread. Block `0` is folded on the
//! calling thread, so a reduction with one partition never spawns a thread. Each worker folds
//! its block into a private partial result without any synchronization.
//!
//! ## Combination
//!
//! When a worker finishes its fold, it locks the shared accumulator, combines its partial
//! result into it and releases the lock. This is the only point of contention and it happens
//! once per worker, regardless of the number of items.
//!
//! ## Failures
//!
//! Errors returned by the per-element function and panics raised by any user-provided function
//! are captured on the worker. After every worker has been joined, the reduction fails with the
//! first failure recorded. No partial result is ever returned.
//!
//! # Example
//!
//! ```
//! // Approximate π/4 with the midpoint rule, using 8 workers.
//! let steps = 1_000_000;
//!
//! let quarter = par_reduce::reduce(
//!     steps,
//!     8,
//!     |i| {
//!         let x = (i as f64 + 0.5) / steps as f64;
//!         1.0 / (1.0 + x * x)
//!     },
//!     |a, b| a + b,
//!     0.0,
//! )
//! .unwrap();
//!
//! let pi = 4.0 * quarter / steps as f64;
//! assert!((pi - std::f64::consts::PI).abs() < 1e-3);
//! ```

mod accumulator;
mod builder;
mod error;
mod partition;
mod reducer;
mod worker;

pub mod pi;

pub(crate) use accumulator::SharedAccumulator;
pub use builder::*;
pub use error::*;
pub use partition::*;
pub use reducer::{Reducer, reduce, try_reduce};
pub(crate) use worker::{panic_message, run_partition};
