//! Reroutine: poll-driven re-entrant routines for straight-line code.
//!
//! # Overview
//!
//! A routine body is ordinary sequential code: steps, waits, loops. The host
//! calls it over and over from a poll loop; each call replays the body from
//! the top, skips everything already finished, gives the single pending step
//! one chance to make progress, and returns. No coroutine, thread, or saved
//! continuation is involved: resumption is reconstructed from call-site
//! identity and a ledger of finished steps.
//!
//! # Core guarantees
//!
//! - **Exactly-once effects**: a [`Routine::step`] action runs on one poll, ever
//! - **Strict order**: nothing acts before everything textually preceding it has finished
//! - **Fixed deadlines**: a timed wait's deadline is set at first reach and never restarts
//! - **Unwind safety**: a panicking action leaves the nesting stack balanced and is retried
//! - **Deterministic testing**: virtual clock plus bounded poll drivers
//!
//! # Module structure
//!
//! - [`routine`]: the routine type, its primitives and lifecycle
//! - [`site`]: call-site identity
//! - [`path`]: execution paths (frames and their encoding)
//! - [`time`]: time values, clock sources, the virtual test clock
//! - [`signal`]: external completion signals
//! - [`test_utils`]: logging and poll-driver helpers (feature `test-support`)
//!
//! # Example
//!
//! ```
//! use reroutine::{Routine, VirtualClock};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = Arc::new(VirtualClock::new());
//! let mut routine = Routine::with_clock(clock.clone());
//! let mut log = Vec::new();
//!
//! for _ in 0..4 {
//!     routine.start();
//!     routine.step(|| log.push("begin"));
//!     routine.wait_for(Duration::from_millis(20));
//!     routine.step(|| log.push("after pause"));
//!     routine.end();
//!     clock.advance(10_000_000); // 10ms between polls
//! }
//!
//! assert!(routine.is_completed());
//! assert_eq!(log, ["begin", "after pause"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

mod ledger;
mod scope;

pub mod path;
pub mod routine;
pub mod signal;
pub mod site;
#[cfg(feature = "test-support")]
pub mod test_utils;
pub mod time;

pub use path::{Frame, Path};
pub use routine::Routine;
pub use signal::{Flag, Signal};
pub use site::SiteId;
pub use time::{Time, TimeSource, VirtualClock, WallClock};
