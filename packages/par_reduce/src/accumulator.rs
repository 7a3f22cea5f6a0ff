use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{Error, WorkerFailure};

/// The only mutable state shared between the workers of one reduction.
///
/// Holds the running combined value, the number of partial results merged into it and the
/// first worker failure recorded. The value only changes while the lock is held, by exactly one
/// combine per worker.
#[derive(Debug)]
pub(crate) struct SharedAccumulator<T, E> {
    state: Mutex<State<T, E>>,
}

#[derive(Debug)]
struct State<T, E> {
    // `None` only if a combine panicked while the lock was held, in which case the panicking
    // worker records a failure and the value is never read.
    value: Option<T>,
    contributions: usize,
    failure: Option<WorkerFailure<E>>,
}

impl<T, E> SharedAccumulator<T, E> {
    pub(crate) fn new(identity: T) -> Self {
        Self {
            state: Mutex::new(State {
                value: Some(identity),
                contributions: 0,
                failure: None,
            }),
        }
    }

    /// Merges one worker's partial result into the shared value.
    ///
    /// The lock is held only for the duration of the single `combine` call.
    pub(crate) fn publish<C>(&self, partial: T, combine: &C)
    where
        C: Fn(T, T) -> T,
    {
        let mut state = self.state.lock();

        if let Some(current) = state.value.take() {
            state.value = Some(combine(current, partial));
            state.contributions = state.contributions.saturating_add(1);
        }
    }

    /// Records a worker failure. Only the first failure is kept.
    pub(crate) fn record_failure(&self, failure: WorkerFailure<E>) {
        let mut state = self.state.lock();

        if state.failure.is_none() {
            debug!(
                partition = failure.partition(),
                index = failure.index(),
                "worker failure recorded"
            );
            state.failure = Some(failure);
        } else {
            trace!(
                partition = failure.partition(),
                "discarding worker failure because an earlier one was already recorded"
            );
        }
    }

    /// Consumes the accumulator after every worker has been joined, returning the final value
    /// or the first failure recorded.
    pub(crate) fn finish(self, expected_contributions: usize) -> Result<T, Error<E>> {
        let state = self.state.into_inner();

        if let Some(failure) = state.failure {
            return Err(Error::WorkerFailure(failure));
        }

        debug_assert_eq!(
            state.contributions, expected_contributions,
            "every worker must publish exactly once"
        );

        Ok(state
            .value
            .expect("the value is only taken out by a panicking combine, which records a failure"))
    }
}
