//! Logic executed by every worker, whether spawned or running inline on the calling thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::trace;

use crate::{Cause, SharedAccumulator, WorkRange, WorkerFailure};

/// Folds one work range into a local partial result and publishes it to the shared accumulator.
///
/// The fold runs without any synchronization. Failures, including panics from the fold or from
/// `combine`, are captured and recorded in the accumulator instead of propagating.
///
/// The fold reports the element it is currently evaluating via the `position` argument, so that
/// a failure can be attributed to a specific index.
pub(crate) fn run_partition<T, E, F, C>(
    partition: usize,
    range: WorkRange,
    identity: T,
    fold: &F,
    combine: &C,
    shared: &SharedAccumulator<T, E>,
) where
    F: Fn(WorkRange, T, &mut Option<usize>) -> Result<T, E>,
    C: Fn(T, T) -> T,
{
    trace!(partition, %range, "worker started");

    let mut position = None;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let partial = fold(range, identity, &mut position)?;
        shared.publish(partial, combine);
        Ok::<(), E>(())
    }));

    let cause = match outcome {
        Ok(Ok(())) => {
            trace!(partition, "worker finished");
            return;
        }
        Ok(Err(error)) => Cause::Failed(error),
        Err(payload) => Cause::Panicked(panic_message(payload.as_ref())),
    };

    shared.record_failure(WorkerFailure::new(partition, range, position, cause));
}

/// Extracts the message from a panic payload, if the panic was raised with a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
