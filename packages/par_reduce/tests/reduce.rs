//! Integration tests for the reducer, exercising real worker threads.
//!
//! These tests are ignored under Miri because Miri is far too slow for the item counts used.

use std::f64::consts::PI;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use new_zealand::nz;
use par_reduce::{Cause, Error, Reducer, partition, reduce, try_reduce};
use testing::{assert_close, with_watchdog};

#[cfg_attr(miri, ignore)]
#[test]
fn counting_ones_yields_item_count_for_every_shape() {
    with_watchdog(|| {
        for items in [1_usize, 2, 7, 10, 64, 1000, 1001] {
            // One partition per item only for small counts, to keep the thread count sane.
            for partitions in [1, 2, 3, 5, 8, items.min(64)] {
                if partitions > items {
                    continue;
                }

                let count = reduce(items, partitions, |_| 1_usize, |a, b| a + b, 0).unwrap();

                assert_eq!(count, items, "{items} items over {partitions} partitions");
            }
        }
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn partition_count_does_not_change_integer_result() {
    with_watchdog(|| {
        let items = 500;
        let expected = reduce(items, 1, |i| i as u64 * 3, |a, b| a + b, 0).unwrap();

        for partitions in [2, 3, 4, 7, 16, 100, items] {
            let actual = reduce(items, partitions, |i| i as u64 * 3, |a, b| a + b, 0).unwrap();

            assert_eq!(actual, expected, "{partitions} partitions");
        }
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn partition_count_changes_float_result_only_within_tolerance() {
    with_watchdog(|| {
        let items = 100_000;
        let f = |i: usize| 1.0 / (i as f64 + 1.0);

        let inline = reduce(items, 1, f, |a, b| a + b, 0.0).unwrap();

        for partitions in [2, 5, 8, 13] {
            let parallel = reduce(items, partitions, f, |a, b| a + b, 0.0).unwrap();

            assert_close(parallel, inline, 1e-9);
        }
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn quarter_pi_scenario() {
    with_watchdog(|| {
        let n = 1_000_000;

        let quarter = reduce(
            n,
            8,
            |i| {
                let x = (i as f64 + 0.5) / n as f64;
                1.0 / (1.0 + x * x)
            },
            |a, b| a + b,
            0.0,
        )
        .unwrap();

        assert_close(quarter * 4.0 / n as f64, PI, 1e-3);
    });
}

#[test]
fn ten_items_three_partitions_layout() {
    let ranges = partition(10, 3).unwrap();

    let covered = ranges
        .iter()
        .flat_map(|range| range.indexes())
        .collect::<Vec<_>>();

    assert_eq!(covered, (0..10).collect::<Vec<_>>());
    assert_eq!(
        ranges.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["[0, 3)", "[3, 6)", "[6, 10)"]
    );
}

#[cfg_attr(miri, ignore)]
#[test]
fn ten_items_three_partitions_evaluates_each_index_once() {
    with_watchdog(|| {
        let seen = Mutex::new(Vec::new());

        reduce(
            10,
            3,
            |i| {
                seen.lock().unwrap().push(i);
                0_u8
            },
            |a, _| a,
            0,
        )
        .unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();

        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    });
}

#[test]
fn empty_range_returns_identity_without_evaluating() {
    let calls = AtomicUsize::new(0);

    let result = reduce(
        0,
        3,
        |_| {
            calls.fetch_add(1, Ordering::Relaxed);
            1_i64
        },
        |a, b| a + b,
        -5,
    )
    .unwrap();

    assert_eq!(result, -5);
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn invalid_partition_counts_fail_fast() {
    for (items, partitions) in [(10, 0), (10, 11), (1, 2), (0, 0)] {
        let error = reduce(items, partitions, |i| i, |a, b| a + b, 0).unwrap_err();

        let Error::InvalidPartition(invalid) = error else {
            panic!("expected InvalidPartition for {items}/{partitions}");
        };

        assert_eq!(invalid.items(), items);
        assert_eq!(invalid.partitions(), partitions);
    }
}

#[cfg_attr(miri, ignore)]
#[test]
fn single_failing_index_fails_the_reduction() {
    with_watchdog(|| {
        for failing_index in [0, 499, 500, 999] {
            let result = try_reduce(
                1000,
                4,
                |i| {
                    if i == failing_index {
                        Err(format!("index {i} rejected"))
                    } else {
                        Ok(1_u32)
                    }
                },
                |a, b| a + b,
                0,
            );

            let Err(Error::WorkerFailure(failure)) = result else {
                panic!("expected a worker failure for index {failing_index}");
            };

            assert_eq!(failure.index(), Some(failing_index));
            assert_eq!(failure.partition(), failing_index / 250);

            let Cause::Failed(message) = failure.cause() else {
                panic!("expected a returned error");
            };

            assert_eq!(message, &format!("index {failing_index} rejected"));
        }
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn many_failures_report_exactly_one() {
    with_watchdog(|| {
        let result = try_reduce(
            800,
            8,
            |i| if i % 100 == 50 { Err(i) } else { Ok(1_u32) },
            |a, b| a + b,
            0,
        );

        let Err(Error::WorkerFailure(failure)) = result else {
            panic!("expected a worker failure");
        };

        // Any of the failing indexes may be the first one recorded.
        let index = failure.index().unwrap();
        assert_eq!(index % 100, 50);
        assert!(matches!(failure.cause(), Cause::Failed(i) if *i == index));
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn panicking_combine_fails_the_reduction() {
    with_watchdog(|| {
        let result = reduce(
            100,
            4,
            |i| i,
            |a, b| {
                assert!(a + b < 1000, "sum grew too large");
                a + b
            },
            0,
        );

        let Err(Error::WorkerFailure(failure)) = result else {
            panic!("expected a worker failure");
        };

        assert!(matches!(
            failure.cause(),
            Cause::Panicked(message) if message == "sum grew too large"
        ));
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn reducer_can_be_shared_between_threads() {
    with_watchdog(|| {
        let reducer = Reducer::builder().partitions(nz!(3)).build();

        std::thread::scope(|s| {
            let handles = (0..4_u64)
                .map(|offset| {
                    let reducer = &reducer;
                    s.spawn(move || {
                        reducer
                            .reduce(300, |i| i as u64 + offset, |a, b| a + b, 0)
                            .unwrap()
                    })
                })
                .collect::<Vec<_>>();

            for (offset, handle) in (0..4_u64).zip(handles) {
                assert_eq!(handle.join().unwrap(), 44_850 + 300 * offset);
            }
        });
    });
}
