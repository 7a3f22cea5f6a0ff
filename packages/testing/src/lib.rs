#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in this workspace.

use std::panic;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs a test on a separate thread and fails it if it does not finish within 30 seconds.
///
/// A reduction that never joins one of its workers would otherwise hang the test run forever.
///
/// Setting the `MUTATION_TESTING` environment variable to "1" disables the watchdog, so that
/// mutation testing can observe hanging mutations through its own timeout.
///
/// # Panics
///
/// Panics if the test times out. If the test itself panics, that panic is resumed on the
/// calling thread.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| (0..10).sum::<u32>());
/// assert_eq!(sum, 45);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    with_watchdog_timeout(DEFAULT_TIMEOUT, test_fn)
}

/// Like [`with_watchdog()`] but with a custom timeout.
///
/// # Panics
///
/// Panics if the test times out. If the test itself panics, that panic is resumed on the
/// calling thread.
pub fn with_watchdog_timeout<F, R>(timeout: Duration, test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_thread = thread::spawn(move || {
        // If the receiver has timed out, nobody is interested in the result anymore.
        drop(tx.send(test_fn()));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            if let Err(payload) = test_thread.join() {
                panic::resume_unwind(payload);
            }

            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {timeout:?}");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_thread.join() {
            Ok(()) => panic!("test thread exited without producing a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Asserts that two floating point values differ by no more than `tolerance`.
///
/// # Panics
///
/// Panics if the values are further apart than `tolerance` or if either value is NaN.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let diff = (actual - expected).abs();

    assert!(
        diff <= tolerance,
        "{actual} is not within {tolerance} of {expected} (difference {diff})"
    );
}
