#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

pub use reroutine::test_utils::{
    drive, drive_n, drive_with_budget, init_test_logging, test_routine, StallError,
    DEFAULT_POLL_BUDGET,
};
pub use reroutine::{assert_with_log, test_complete, test_phase, test_section};

/// Initialize logging and announce the test. Call first in every test.
pub fn init_test(test_name: &str) {
    init_test_logging();
    test_phase!(test_name);
}

/// Milliseconds expressed in clock nanoseconds.
pub const fn ms(millis: u64) -> u64 {
    millis * 1_000_000
}
