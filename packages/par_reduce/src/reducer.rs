use std::convert::Infallible;
use std::num::NonZero;
use std::{io, thread};

use many_cpus::ProcessorSet;
use tracing::debug;

use crate::{
    Cause, Error, InvalidPartition, ReducerBuilder, SharedAccumulator, WorkRange, WorkerFailure,
    panic_message, partition, run_partition,
};

pub(crate) const DEFAULT_THREAD_NAME: &str = "par_reduce";

/// Executes fork/join reductions over the index range `[0, items)`.
///
/// Each reduction splits the range into a fixed number of partitions (see [`partition()`]).
/// All partitions except the first are folded by freshly spawned worker threads, while the
/// first partition is folded inline on the calling thread. Every worker folds its range into a
/// private partial result and then merges it into a lock-protected shared accumulator exactly
/// once. The call returns only after every worker has been joined.
///
/// A `Reducer` only holds configuration. No state is carried over from one reduction to the
/// next, so the same instance may be used concurrently from multiple threads.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use par_reduce::Reducer;
///
/// let reducer = Reducer::builder().partitions(nz!(4)).build();
///
/// let sum_of_squares = reducer
///     .reduce(1000, |i| (i as u64) * (i as u64), |a, b| a + b, 0)
///     .unwrap();
///
/// assert_eq!(sum_of_squares, 332_833_500);
/// ```
///
/// # Result ordering
///
/// Partial results are combined in whatever order the workers finish, so `combine` must be
/// associative and commutative. Floating point sums are therefore only reproducible within
/// rounding tolerance, not bit for bit.
#[derive(Clone, Debug)]
pub struct Reducer {
    partitions: NonZero<usize>,
    processors: Option<ProcessorSet>,
    thread_name: String,

    // Spawning the worker for this partition fails, to exercise the spawn failure path.
    #[cfg(test)]
    fail_spawn_at: Option<usize>,
}

impl Reducer {
    /// Creates a reducer with the default configuration: one partition per processor in the
    /// default processor set and no processor pinning.
    ///
    /// A reduction over fewer items than there are partitions fails with
    /// [`Error::InvalidPartition`], so on a machine with 8 processors this reducer rejects
    /// `items` between 1 and 7. Use [`Reducer::builder()`] to set a smaller partition count
    /// for small inputs.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring a reducer.
    #[must_use]
    pub fn builder() -> ReducerBuilder {
        ReducerBuilder::new()
    }

    pub(crate) fn from_parts(
        partitions: NonZero<usize>,
        processors: Option<ProcessorSet>,
        thread_name: String,
    ) -> Self {
        Self {
            partitions,
            processors,
            thread_name,
            #[cfg(test)]
            fail_spawn_at: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn fail_spawn_at(mut self, partition: usize) -> Self {
        self.fail_spawn_at = Some(partition);
        self
    }

    /// The number of partitions each reduction is split into.
    #[must_use]
    pub fn partitions(&self) -> NonZero<usize> {
        self.partitions
    }

    /// Folds `per_element(i)` for every `i` in `[0, items)` using `combine`, starting each
    /// partition from `identity`.
    ///
    /// If `items` is zero, `identity` is returned without calling `per_element` or spawning
    /// any threads.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidPartition`] if the partition count exceeds a nonzero `items`.
    /// * [`Error::WorkerFailure`] if `per_element` or `combine` panicked.
    /// * [`Error::SpawnFailed`] if a worker thread could not be started.
    pub fn reduce<T, F, C>(
        &self,
        items: usize,
        per_element: F,
        combine: C,
        identity: T,
    ) -> Result<T, Error>
    where
        T: Clone + Send,
        F: Fn(usize) -> T + Sync,
        C: Fn(T, T) -> T + Sync,
    {
        self.try_reduce(
            items,
            |i| Ok::<T, Infallible>(per_element(i)),
            combine,
            identity,
        )
    }

    /// Like [`reduce()`][Self::reduce] but with a fallible per-element function.
    ///
    /// A worker stops folding its partition at the first element that returns an error. Other
    /// workers run to completion and are joined before the error is returned.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidPartition`] if the partition count exceeds a nonzero `items`.
    /// * [`Error::WorkerFailure`] if `per_element` returned an error or if `per_element` or
    ///   `combine` panicked. Only the first failure recorded is reported.
    /// * [`Error::SpawnFailed`] if a worker thread could not be started.
    pub fn try_reduce<T, E, F, C>(
        &self,
        items: usize,
        per_element: F,
        combine: C,
        identity: T,
    ) -> Result<T, Error<E>>
    where
        T: Clone + Send,
        E: Send,
        F: Fn(usize) -> Result<T, E> + Sync,
        C: Fn(T, T) -> T + Sync,
    {
        self.execute(
            items,
            identity,
            &combine,
            |range: WorkRange, mut local: T, position: &mut Option<usize>| {
                for i in range.indexes() {
                    *position = Some(i);
                    local = combine(local, per_element(i)?);
                }

                *position = None;
                Ok(local)
            },
        )
    }

    /// Reduces `[0, items)` by calling `fold_partition` once per partition and combining the
    /// partial results with `combine`.
    ///
    /// Use this when a partition needs private state that should not be recreated per element,
    /// such as a random number generator or a scratch buffer. `identity` is returned as-is when
    /// `items` is zero and is otherwise only used as the starting value of the combination.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidPartition`] if the partition count exceeds a nonzero `items`.
    /// * [`Error::WorkerFailure`] if `fold_partition` returned an error or if `fold_partition`
    ///   or `combine` panicked. The failure carries no element index.
    /// * [`Error::SpawnFailed`] if a worker thread could not be started.
    pub fn try_reduce_partitions<T, E, F, C>(
        &self,
        items: usize,
        fold_partition: F,
        combine: C,
        identity: T,
    ) -> Result<T, Error<E>>
    where
        T: Clone + Send,
        E: Send,
        F: Fn(WorkRange) -> Result<T, E> + Sync,
        C: Fn(T, T) -> T + Sync,
    {
        self.execute(
            items,
            identity,
            &combine,
            |range: WorkRange, local: T, _position: &mut Option<usize>| {
                Ok(combine(local, fold_partition(range)?))
            },
        )
    }

    fn execute<T, E, F, C>(
        &self,
        items: usize,
        identity: T,
        combine: &C,
        fold: F,
    ) -> Result<T, Error<E>>
    where
        T: Clone + Send,
        E: Send,
        F: Fn(WorkRange, T, &mut Option<usize>) -> Result<T, E> + Sync,
        C: Fn(T, T) -> T + Sync,
    {
        let ranges = partition(items, self.partitions.get())?;

        let Some((&first, rest)) = ranges.split_first() else {
            debug!("nothing to reduce, returning identity");
            return Ok(identity);
        };

        debug!(items, partitions = ranges.len(), "reduction starting");

        let shared = SharedAccumulator::new(identity.clone());

        thread::scope(|scope| -> Result<(), Error<E>> {
            let mut workers = Vec::with_capacity(rest.len());
            let mut spawn_failure = None;

            for (partition, &range) in (1..).zip(rest) {
                let processors = self.processors.clone();
                let identity = identity.clone();
                let fold = &fold;
                let shared = &shared;

                let spawned = self.spawn_worker(scope, partition, move || {
                    if let Some(processors) = processors {
                        processors.pin_current_thread_to();
                    }

                    run_partition(partition, range, identity, fold, combine, shared);
                });

                match spawned {
                    Ok(handle) => workers.push((partition, range, handle)),
                    Err(source) => {
                        debug!(partition, %source, "failed to spawn worker thread");
                        spawn_failure = Some(Error::SpawnFailed { partition, source });
                        break;
                    }
                }
            }

            // The calling thread is one of the workers, unless we are already bailing out.
            if spawn_failure.is_none() {
                run_partition(0, first, identity, &fold, combine, &shared);
            }

            for (partition, range, handle) in workers {
                // Worker bodies capture their own panics, so this only catches failures
                // outside the fold, such as a failure to pin the thread.
                if let Err(payload) = handle.join() {
                    shared.record_failure(WorkerFailure::new(
                        partition,
                        range,
                        None,
                        Cause::Panicked(panic_message(payload.as_ref())),
                    ));
                }
            }

            spawn_failure.map_or(Ok(()), Err)
        })?;

        let result = shared.finish(ranges.len());

        match &result {
            Ok(_) => debug!(items, partitions = ranges.len(), "reduction completed"),
            Err(_) => debug!(items, partitions = ranges.len(), "reduction failed"),
        }

        result
    }

    fn spawn_worker<'scope, B>(
        &self,
        scope: &'scope thread::Scope<'scope, '_>,
        partition: usize,
        body: B,
    ) -> io::Result<thread::ScopedJoinHandle<'scope, ()>>
    where
        B: FnOnce() + Send + 'scope,
    {
        #[cfg(test)]
        if self.fail_spawn_at == Some(partition) {
            return Err(io::Error::other("worker spawn refused"));
        }

        thread::Builder::new()
            .name(format!("{}-{partition}", self.thread_name))
            .spawn_scoped(scope, body)
    }
}

/// Same as [`Reducer::new()`], including its partition count limits on small inputs.
impl Default for Reducer {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds `per_element(i)` for every `i` in `[0, items)` using `combine`, splitting the work
/// into `partitions` contiguous blocks.
///
/// `partitions - 1` worker threads are spawned and the calling thread folds the first block.
/// This is a shorthand for [`Reducer::reduce()`] on a reducer configured with the given
/// partition count.
///
/// # Errors
///
/// * [`Error::InvalidPartition`] if `partitions` is zero or exceeds a nonzero `items`.
/// * [`Error::WorkerFailure`] if `per_element` or `combine` panicked.
/// * [`Error::SpawnFailed`] if a worker thread could not be started.
///
/// # Example
///
/// ```
/// let count = par_reduce::reduce(10, 3, |_| 1_u32, |a, b| a + b, 0).unwrap();
///
/// assert_eq!(count, 10);
/// ```
pub fn reduce<T, F, C>(
    items: usize,
    partitions: usize,
    per_element: F,
    combine: C,
    identity: T,
) -> Result<T, Error>
where
    T: Clone + Send,
    F: Fn(usize) -> T + Sync,
    C: Fn(T, T) -> T + Sync,
{
    with_partitions(items, partitions)?.reduce(items, per_element, combine, identity)
}

/// Like [`reduce()`] but with a fallible per-element function.
///
/// # Errors
///
/// * [`Error::InvalidPartition`] if `partitions` is zero or exceeds a nonzero `items`.
/// * [`Error::WorkerFailure`] if `per_element` returned an error or if `per_element` or
///   `combine` panicked. Only the first failure recorded is reported.
/// * [`Error::SpawnFailed`] if a worker thread could not be started.
///
/// # Example
///
/// ```
/// use par_reduce::Error;
///
/// let result = par_reduce::try_reduce(
///     100,
///     4,
///     |i| if i == 42 { Err("no 42 allowed") } else { Ok(i) },
///     |a, b| a + b,
///     0,
/// );
///
/// let Err(Error::WorkerFailure(failure)) = result else {
///     panic!("expected a worker failure");
/// };
///
/// assert_eq!(failure.index(), Some(42));
/// ```
pub fn try_reduce<T, E, F, C>(
    items: usize,
    partitions: usize,
    per_element: F,
    combine: C,
    identity: T,
) -> Result<T, Error<E>>
where
    T: Clone + Send,
    E: Send,
    F: Fn(usize) -> Result<T, E> + Sync,
    C: Fn(T, T) -> T + Sync,
{
    with_partitions(items, partitions)?.try_reduce(items, per_element, combine, identity)
}

pub(crate) fn with_partitions(
    items: usize,
    partitions: usize,
) -> Result<Reducer, InvalidPartition> {
    let partitions = NonZero::new(partitions).ok_or(InvalidPartition { items, partitions })?;

    Ok(Reducer::from_parts(partitions, None, DEFAULT_THREAD_NAME.to_string()))
}
