use std::num::NonZero;

use many_cpus::{ProcessorSet, SystemHardware};

use crate::Reducer;
use crate::reducer::DEFAULT_THREAD_NAME;

/// Builder for configuring a [`Reducer`].
///
/// # Example
///
/// ```
/// use many_cpus::SystemHardware;
/// use new_zealand::nz;
/// use par_reduce::Reducer;
///
/// let reducer = Reducer::builder()
///     .partitions(nz!(8))
///     .thread_name("pi-worker")
///     .build();
///
/// assert_eq!(reducer.partitions().get(), 8);
///
/// // Pin the spawned workers to a specific set of processors.
/// if let Some(processors) = SystemHardware::current()
///     .processors()
///     .to_builder()
///     .take(nz!(2))
/// {
///     let pinned = Reducer::builder().processors(processors).build();
///     assert_eq!(pinned.partitions().get(), 2);
/// }
/// ```
#[derive(Debug, Default)]
#[must_use]
pub struct ReducerBuilder {
    partitions: Option<NonZero<usize>>,
    processors: Option<ProcessorSet>,
    thread_name: Option<String>,
}

impl ReducerBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets the number of partitions each reduction is split into. One partition is executed
    /// on the calling thread, the rest on spawned worker threads.
    ///
    /// Default is the number of processors in the configured processor set, or in the default
    /// processor set if none was configured.
    pub fn partitions(mut self, count: NonZero<usize>) -> Self {
        self.partitions = Some(count);
        self
    }

    /// Restricts the spawned worker threads to the processors in the given set.
    ///
    /// The calling thread, which executes the first partition, is not modified.
    ///
    /// By default, worker threads are not pinned to any processors.
    pub fn processors(mut self, processors: ProcessorSet) -> Self {
        self.processors = Some(processors);
        self
    }

    /// Sets the prefix of worker thread names. Workers are named `{prefix}-{partition}`.
    ///
    /// Thread names cannot contain NUL characters, so any in the prefix are removed.
    ///
    /// Default is `par_reduce`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = Some(prefix.into());
        self
    }

    /// Builds the reducer with the configured settings.
    #[must_use]
    pub fn build(self) -> Reducer {
        let partitions = self.partitions.unwrap_or_else(|| {
            let processor_count = self
                .processors
                .as_ref()
                .map_or_else(|| SystemHardware::current().processors().len(), ProcessorSet::len);

            NonZero::new(processor_count)
                .expect("guarded by fact that ProcessorSet is never empty")
        });

        // Spawning a thread whose name contains NUL panics instead of returning an error.
        let thread_name = self.thread_name.map_or_else(
            || DEFAULT_THREAD_NAME.to_string(),
            |prefix| prefix.replace('\0', ""),
        );

        Reducer::from_parts(partitions, self.processors, thread_name)
    }
}
