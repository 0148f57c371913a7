//! Test support for routine-driven code.
//!
//! This module provides shared helpers for tests:
//! - Consistent tracing-based logging initialization
//! - Bounded poll-loop drivers with stall detection
//! - A virtual-clock routine constructor
//! - Phase/section macros for readable test output
//!
//! Enabled by the `test-support` feature; this crate's own suites turn it
//! on through a dev-dependency on itself.

use crate::routine::Routine;
use crate::time::VirtualClock;
use std::sync::{Arc, Once};
use thiserror::Error;

static INIT_LOGGING: Once = Once::new();

/// Default number of polls [`drive`] allows before declaring a stall.
pub const DEFAULT_POLL_BUDGET: usize = 10_000;

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// A routine failed to complete within its poll budget.
///
/// Returned by [`drive`] when the budget runs out, which in a test almost
/// always means a wait whose condition never becomes true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("routine still pending after {polls} polls")]
pub struct StallError {
    /// Number of polls performed before giving up.
    pub polls: usize,
}

/// A fresh virtual clock and a routine timing its waits against it.
#[must_use]
pub fn test_routine() -> (Arc<VirtualClock>, Routine) {
    let clock = Arc::new(VirtualClock::new());
    let routine = Routine::with_clock(clock.clone());
    (clock, routine)
}

/// Polls `body` against `routine` until the routine completes.
///
/// Returns the number of polls taken, or [`StallError`] once `budget` polls
/// have passed without completion.
pub fn drive_with_budget(
    routine: &mut Routine,
    budget: usize,
    mut body: impl FnMut(&mut Routine),
) -> Result<usize, StallError> {
    for polls in 1..=budget {
        body(routine);
        if routine.is_completed() {
            return Ok(polls);
        }
    }
    Err(StallError { polls: budget })
}

/// [`drive_with_budget`] with [`DEFAULT_POLL_BUDGET`].
pub fn drive(
    routine: &mut Routine,
    body: impl FnMut(&mut Routine),
) -> Result<usize, StallError> {
    drive_with_budget(routine, DEFAULT_POLL_BUDGET, body)
}

/// Polls `body` against `routine` exactly `polls` times.
pub fn drive_n(routine: &mut Routine, polls: usize, mut body: impl FnMut(&mut Routine)) {
    for _ in 0..polls {
        body(routine);
    }
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
