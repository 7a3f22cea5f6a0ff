use std::convert::Infallible;
use std::{fmt, io};

use thiserror::Error;

use crate::WorkRange;

/// Errors that can occur when executing a reduction.
///
/// The type parameter is the error type of the per-element or per-partition function.
/// Reductions whose functions cannot fail use the default of [`Infallible`], in which case
/// worker failures can only originate from panics.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error<E = Infallible> {
    /// The requested partition count is not usable for the requested item count.
    /// Nothing was executed.
    #[error(transparent)]
    InvalidPartition(#[from] InvalidPartition),

    /// At least one worker failed. The reduction produced no result.
    ///
    /// If several workers failed, only the first failure recorded is reported.
    #[error(transparent)]
    WorkerFailure(WorkerFailure<E>),

    /// The operating system refused to start a worker thread.
    ///
    /// Workers that had already been started were joined before this error was returned.
    #[error("failed to start the worker thread for partition {partition}")]
    SpawnFailed {
        /// The partition that would have been executed by the thread.
        partition: usize,

        /// The error reported when spawning the thread.
        #[source]
        source: io::Error,
    },
}

/// The partition count is zero or exceeds a nonzero item count.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error(
    "cannot split {items} items into {partitions} partitions: the partition count must be between 1 and the item count"
)]
pub struct InvalidPartition {
    pub(crate) items: usize,
    pub(crate) partitions: usize,
}

impl InvalidPartition {
    /// The item count that was requested.
    #[must_use]
    pub fn items(&self) -> usize {
        self.items
    }

    /// The partition count that was requested.
    #[must_use]
    pub fn partitions(&self) -> usize {
        self.partitions
    }
}

/// Describes the failure of one worker: which partition it was processing, the element it was
/// evaluating at the time (if known) and what went wrong.
#[derive(Debug)]
pub struct WorkerFailure<E> {
    partition: usize,
    range: WorkRange,
    index: Option<usize>,
    cause: Cause<E>,
}

impl<E> WorkerFailure<E> {
    pub(crate) fn new(
        partition: usize,
        range: WorkRange,
        index: Option<usize>,
        cause: Cause<E>,
    ) -> Self {
        Self {
            partition,
            range,
            index,
            cause,
        }
    }

    /// The zero-based number of the partition whose worker failed.
    #[must_use]
    pub fn partition(&self) -> usize {
        self.partition
    }

    /// The work range assigned to the failed worker.
    #[must_use]
    pub fn range(&self) -> WorkRange {
        self.range
    }

    /// The element index being evaluated when the failure occurred.
    ///
    /// This is `None` if the failure did not happen while evaluating a specific element,
    /// for example in a per-partition fold or while combining the partial result.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// What went wrong.
    #[must_use]
    pub fn cause(&self) -> &Cause<E> {
        &self.cause
    }

    /// Consumes the failure, returning what went wrong.
    #[must_use]
    pub fn into_cause(self) -> Cause<E> {
        self.cause
    }
}

impl<E: fmt::Display> fmt::Display for WorkerFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker for partition {} {} failed", self.partition, self.range)?;

        if let Some(index) = self.index {
            write!(f, " at index {index}")?;
        }

        write!(f, ": {}", self.cause)
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for WorkerFailure<E> {}

/// The reason a worker failed.
#[derive(Debug, derive_more::Display)]
#[non_exhaustive]
pub enum Cause<E> {
    /// The user-provided function returned an error.
    #[display("{_0}")]
    Failed(E),

    /// A user-provided function panicked. Carries the panic message, if it was a string.
    #[display("panicked: {_0}")]
    Panicked(String),
}
