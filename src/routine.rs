//! The routine: lifecycle and the primitive family.
//!
//! A routine body is ordinary straight-line code built from the primitives
//! on [`Routine`]. The host calls the body repeatedly; every call replays it
//! from the top. Steps that already finished return immediately, the single
//! pending step gets one chance to make progress, and everything textually
//! after it stays inert. Resumption is reconstructed, never suspended:
//! there is no coroutine, thread, or saved continuation behind this type.
//!
//! Every primitive is `#[track_caller]`, so a step's identity is the line
//! that invokes it. The identity rules this implies:
//!
//! - the body must be the same code on every poll (one function, polled
//!   many times, not a freshly written-out copy);
//! - a helper that wraps a primitive needs `#[track_caller]` of its own,
//!   or every caller collapses onto the helper's line.
//!
//! Actions passed to [`step`](Routine::step) take no routine access, which
//! keeps them leaves. Nested waits, loops, and steps go through
//! [`scope`](Routine::scope), [`for_range`](Routine::for_range), or
//! [`repeat`](Routine::repeat), which lend the routine to their bodies.
//!
//! # Example
//!
//! ```
//! use reroutine::{Flag, Routine};
//!
//! let done = Flag::new();
//! let mut routine = Routine::started();
//! let mut sent = 0;
//!
//! let mut body = |r: &mut Routine| {
//!     r.step(|| sent += 1);
//!     r.wait_for_done(&done);
//!     r.end();
//! };
//!
//! body(&mut routine);
//! body(&mut routine);
//! assert!(!routine.is_completed()); // still waiting on the flag
//!
//! done.set();
//! body(&mut routine);
//! assert!(routine.is_completed());
//! assert_eq!(sent, 1);
//! ```

use crate::ledger::Ledger;
use crate::path::{Frame, Path};
use crate::scope::ScopeStack;
use crate::signal::Signal;
use crate::site::SiteId;
use crate::time::{TimeSource, WallClock};
use core::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A poll-driven re-entrant routine.
///
/// Holds the replay state for one body: lifecycle flags, the live nesting
/// stack, the ledger of finished and pending steps, and the clock timed
/// waits read. Polling is calling the body with `&mut Routine`; the borrow
/// makes one-poll-at-a-time a compile-time fact.
pub struct Routine {
    started: bool,
    completed: bool,
    scopes: ScopeStack,
    ledger: Ledger,
    clock: Arc<dyn TimeSource>,
}

/// One entered composite frame; pops itself on drop.
///
/// Dropping on unwind keeps the nesting stack balanced when a body panics,
/// so a host that catches the panic can keep polling the routine.
struct Entered<'a> {
    routine: &'a mut Routine,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.routine.scopes.pop();
    }
}

impl Routine {
    // ======================================================================
    // Construction
    // ======================================================================

    /// Creates a routine that is not yet started, timing waits against a
    /// monotonic wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(WallClock::new()))
    }

    /// Creates a routine that times waits against `clock`.
    ///
    /// Pass a [`VirtualClock`](crate::VirtualClock) to drive timed waits
    /// deterministically in tests.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            started: false,
            completed: false,
            scopes: ScopeStack::default(),
            ledger: Ledger::default(),
            clock,
        }
    }

    /// Creates a routine and starts it at the construction site.
    #[must_use]
    #[track_caller]
    pub fn started() -> Self {
        let mut routine = Self::new();
        routine.start();
        routine
    }

    // ======================================================================
    // Lifecycle
    // ======================================================================

    /// Marks the start of the body.
    ///
    /// The first poll to reach this records it; later polls replay it as a
    /// no-op. Calling `start` while started does nothing, so a body is free
    /// to begin with it unconditionally. `start` never clears completion;
    /// only [`reset`](Self::reset) does.
    #[track_caller]
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        let path = self.scopes.leaf_path(Frame::Site(SiteId::here()));
        if self.ledger.is_finalized(&path) {
            return;
        }
        self.ledger.record_arrival(&path);
        self.ledger.finalize(path);
        self.started = true;
        tracing::debug!("routine started");
    }

    /// Marks the end of the body.
    ///
    /// On the first poll where everything before it has finished, flips the
    /// routine to completed and stops it. Anything textually after `end`
    /// never runs while the routine is stopped.
    #[track_caller]
    pub fn end(&mut self) {
        let Some(path) = self.arrive_leaf(SiteId::here()) else {
            return;
        };
        self.ledger.finalize(path);
        self.started = false;
        self.completed = true;
        tracing::debug!(
            finished_steps = self.ledger.completed_count(),
            "routine completed"
        );
    }

    /// Forgets all progress and stops the routine.
    ///
    /// The clock is kept; finished steps, arrival order, boundaries, and
    /// deadlines are dropped, so the next [`start`](Self::start) begins a
    /// fresh pass and timed waits re-arm. Safe to call from inside a body:
    /// the rest of that poll no-ops because the routine is stopped.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.scopes.clear();
        self.started = false;
        self.completed = false;
        tracing::debug!("routine reset");
    }

    /// [`reset`](Self::reset) followed by [`start`](Self::start).
    ///
    /// The restarted pass begins here: the call site of `restart` becomes
    /// the start identity, exactly as if the body had been polled for the
    /// first time from this line.
    #[track_caller]
    pub fn restart(&mut self) {
        self.reset();
        self.start();
    }

    /// True while the routine is between [`start`](Self::start) and
    /// [`end`](Self::end).
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// True once [`end`](Self::end) has run.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    // ======================================================================
    // Leaf primitives
    // ======================================================================

    /// Runs `action` exactly once.
    ///
    /// The first poll to reach this site with everything before it finished
    /// runs the action and finalizes the site; every later poll replays it
    /// as a no-op. The action takes no routine access, which is what keeps
    /// it a leaf; if it panics, the site stays unfinished and the action is
    /// retried on the next poll.
    #[track_caller]
    pub fn step(&mut self, action: impl FnOnce()) {
        let Some(path) = self.arrive_leaf(SiteId::here()) else {
            return;
        };
        action();
        self.ledger.finalize(path);
    }

    /// Pauses the routine for `duration`.
    ///
    /// The deadline is fixed the first time the wait is reached; re-polls
    /// compare the clock against that stored deadline and finalize on the
    /// first poll at or past it. A zero duration completes on the poll that
    /// reaches it. Nothing runs between polls; a poll that never comes back
    /// simply leaves the deadline unobserved.
    #[track_caller]
    pub fn wait_for(&mut self, duration: Duration) {
        let Some(path) = self.arrive_leaf(SiteId::here()) else {
            return;
        };
        let now = self.clock.now();
        let deadline = self.ledger.deadline_for(&path, || now + duration);
        if now >= deadline {
            self.ledger.finalize(path);
        }
    }

    /// Pauses the routine until `condition` holds.
    ///
    /// The predicate is evaluated once per poll while the wait is pending;
    /// the first `true` finalizes it. The predicate takes no routine access
    /// and should be a cheap read of host state.
    #[track_caller]
    pub fn wait_until(&mut self, condition: impl FnOnce() -> bool) {
        let Some(path) = self.arrive_leaf(SiteId::here()) else {
            return;
        };
        if condition() {
            self.ledger.finalize(path);
        }
    }

    /// Pauses until `condition` holds or `duration` elapses, whichever the
    /// poll observes first. The deadline is checked before the predicate,
    /// so a poll past the deadline finalizes without evaluating it.
    #[track_caller]
    pub fn wait_until_or_for(&mut self, condition: impl FnOnce() -> bool, duration: Duration) {
        let Some(path) = self.arrive_leaf(SiteId::here()) else {
            return;
        };
        let now = self.clock.now();
        let deadline = self.ledger.deadline_for(&path, || now + duration);
        if now >= deadline || condition() {
            self.ledger.finalize(path);
        }
    }

    /// Pauses until `signal` reports ready.
    #[track_caller]
    pub fn wait_for_done<S: Signal + ?Sized>(&mut self, signal: &S) {
        let Some(path) = self.arrive_leaf(SiteId::here()) else {
            return;
        };
        if signal.is_ready() {
            self.ledger.finalize(path);
        }
    }

    /// Pauses until `signal` reports ready or `duration` elapses. As with
    /// [`wait_until_or_for`](Self::wait_until_or_for), the deadline is
    /// checked first.
    #[track_caller]
    pub fn wait_for_done_or_timeout<S: Signal + ?Sized>(
        &mut self,
        signal: &S,
        duration: Duration,
    ) {
        let Some(path) = self.arrive_leaf(SiteId::here()) else {
            return;
        };
        let now = self.clock.now();
        let deadline = self.ledger.deadline_for(&path, || now + duration);
        if now >= deadline || signal.is_ready() {
            self.ledger.finalize(path);
        }
    }

    // ======================================================================
    // Composite primitives
    // ======================================================================

    /// Groups nested work under one identity.
    ///
    /// The body receives the routine and may use every primitive, nested
    /// waits included. The scope finalizes only when everything reached
    /// inside it has finished, and nothing textually after the scope runs
    /// before that: the boundary is an ordering barrier in both directions.
    #[track_caller]
    pub fn scope(&mut self, body: impl FnOnce(&mut Self)) {
        let site = SiteId::here();
        let Some(path) = self.arrive_composite(site) else {
            return;
        };
        let guard = self.enter(Frame::Site(site));
        body(&mut *guard.routine);
        drop(guard);
        self.seal_composite(path);
    }

    /// Runs `body` for each index in the half-open range `start..end`.
    ///
    /// Each index gets its own frame, so iteration `i` is a separate stretch
    /// of steps from iteration `i + 1` and completes strictly before it. An
    /// empty range runs nothing and finalizes in order like any other step.
    #[track_caller]
    pub fn for_range(&mut self, start: i64, end: i64, mut body: impl FnMut(&mut Self, i64)) {
        let site = SiteId::here();
        let Some(path) = self.arrive_composite(site) else {
            return;
        };
        let guard = self.enter(Frame::Site(site));
        for index in start..end {
            let entered = guard.routine.enter(Frame::Index(index));
            body(&mut *entered.routine, index);
            drop(entered);
        }
        drop(guard);
        self.seal_composite(path);
    }

    /// Runs `body` `times` times: [`for_range`](Self::for_range) over
    /// `0..times` with the index ignored.
    #[track_caller]
    pub fn repeat(&mut self, times: u64, mut body: impl FnMut(&mut Self)) {
        let end = i64::try_from(times).unwrap_or(i64::MAX);
        self.for_range(0, end, |routine, _| body(routine));
    }

    // ======================================================================
    // Shared preamble and sealing
    // ======================================================================

    /// Leaf preamble: replay fast path and the ordering gate.
    ///
    /// Returns the leaf's path with its arrival recorded when its effect may
    /// run this poll; `None` means the leaf must no-op.
    fn arrive_leaf(&mut self, site: SiteId) -> Option<Path> {
        if !self.started {
            return None;
        }
        let path = self.scopes.leaf_path(Frame::Site(site));
        if self.ledger.is_finalized(&path) {
            return None;
        }
        if !self.ledger.all_preceding_complete(&path) {
            return None;
        }
        self.ledger.record_arrival(&path);
        Some(path)
    }

    /// Composite preamble: replay fast path and the boundary gate.
    ///
    /// A composite runs its body only when everything that had arrived
    /// before its first gate attempt has finished. The boundary is memoized
    /// then, so the composite's own children, arriving behind it, never
    /// hold it back.
    fn arrive_composite(&mut self, site: SiteId) -> Option<Path> {
        if !self.started {
            return None;
        }
        let path = self.scopes.leaf_path(Frame::Site(site));
        if self.ledger.is_finalized(&path) {
            return None;
        }
        let boundary = self.ledger.first_seen_index(&path);
        if !self.ledger.all_complete_before(boundary) {
            return None;
        }
        Some(path)
    }

    /// Composite postamble: arrive and finalize once every path reached so
    /// far has finished. A pending child leaves the composite pending.
    fn seal_composite(&mut self, path: Path) {
        if self.ledger.all_complete() {
            self.ledger.record_arrival(&path);
            self.ledger.finalize(path);
        }
    }

    fn enter(&mut self, frame: Frame) -> Entered<'_> {
        self.scopes.push(frame);
        Entered { routine: self }
    }
}

impl Default for Routine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("started", &self.started)
            .field("completed", &self.completed)
            .field("arrived", &self.ledger.arrival_count())
            .field("finalized", &self.ledger.completed_count())
            .finish()
    }
}
