use std::ops::Range;

use num_integer::Integer;

use crate::InvalidPartition;

/// A half-open interval of element indexes `[start, end)` assigned to exactly one worker.
///
/// Work ranges are created by [`partition()`] and are never shared between workers.
///
/// # Example
///
/// ```
/// use par_reduce::partition;
///
/// let ranges = partition(10, 3).unwrap();
///
/// assert_eq!(ranges[2].start(), 6);
/// assert_eq!(ranges[2].end(), 10);
/// assert_eq!(ranges[2].to_string(), "[6, 10)");
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, derive_more::Display)]
#[display("[{start}, {end})")]
pub struct WorkRange {
    start: usize,
    end: usize,
}

impl WorkRange {
    pub(crate) fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "work range start must not exceed its end");

        Self { start, end }
    }

    /// The first index in the range.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last index in the range.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of indexes in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range contains no indexes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every index in the range, in ascending order.
    #[must_use]
    pub fn indexes(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<WorkRange> for Range<usize> {
    fn from(value: WorkRange) -> Self {
        value.indexes()
    }
}

/// Splits `[0, items)` into `partitions` contiguous, pairwise disjoint work ranges.
///
/// Every range except the last one covers `items / partitions` indexes (integer division).
/// The last range additionally receives the remainder, so the union of all ranges is always
/// exactly `[0, items)`.
///
/// If `items` is zero, there is nothing to partition and an empty slice is returned for any
/// nonzero partition count.
///
/// # Errors
///
/// Returns [`InvalidPartition`] if `partitions` is zero or if `partitions` exceeds a nonzero
/// `items`, as some partitions would then have nothing to do.
///
/// # Example
///
/// ```
/// use par_reduce::partition;
///
/// let ranges = partition(10, 3).unwrap();
/// let bounds = ranges
///     .iter()
///     .map(|r| (r.start(), r.end()))
///     .collect::<Vec<_>>();
///
/// assert_eq!(bounds, vec![(0, 3), (3, 6), (6, 10)]);
/// ```
pub fn partition(items: usize, partitions: usize) -> Result<Box<[WorkRange]>, InvalidPartition> {
    if partitions == 0 || (items != 0 && partitions > items) {
        return Err(InvalidPartition { items, partitions });
    }

    if items == 0 {
        return Ok(Box::default());
    }

    let (block_len, _remainder) = items.div_rem(&partitions);
    let last = partitions.saturating_sub(1);

    Ok((0..partitions)
        .map(|k| {
            // Cannot overflow: k * block_len <= partitions * block_len <= items.
            let start = k.saturating_mul(block_len);
            let end = if k == last {
                items
            } else {
                start.saturating_add(block_len)
            };

            WorkRange::new(start, end)
        })
        .collect())
}
