//! Replay memory.
//!
//! The ledger is everything a routine remembers between polls: which paths
//! have finished, the order in which paths were first reached, where each
//! composite stood in that order when it first tried to run, and the fixed
//! deadline of every timed wait. Two reads carry replay: [`is_finalized`]
//! decides whether a revisited step is a no-op, and the gating predicates
//! decide whether the single pending step may act yet.
//!
//! [`is_finalized`]: Ledger::is_finalized

use crate::path::Path;
use crate::time::Time;
use std::collections::{HashMap, HashSet};

/// Persistent per-routine execution state.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    /// Finished paths. Membership makes a replayed step a no-op.
    completed: HashSet<Path>,
    /// Paths in first-reach order. Never contains duplicates.
    arrivals: Vec<Path>,
    /// Arrival-sequence length at each composite's first gate attempt.
    first_seen: HashMap<Path, usize>,
    /// Deadline of each timed wait, fixed at first gated reach.
    deadlines: HashMap<Path, Time>,
}

impl Ledger {
    /// Records `path` as reached, unless it is the entry recorded last.
    ///
    /// Only one path can be pending at a time, so a path reaching this point
    /// again is always the most recent entry; checking the tail is a full
    /// duplicate check.
    pub(crate) fn record_arrival(&mut self, path: &Path) {
        if self.arrivals.last() == Some(path) {
            return;
        }
        tracing::trace!(path = %path, position = self.arrivals.len(), "arrival");
        self.arrivals.push(path.clone());
    }

    /// Marks `path` finished.
    pub(crate) fn finalize(&mut self, path: Path) {
        debug_assert!(
            self.arrivals.contains(&path),
            "finalize before arrival: {path}"
        );
        tracing::trace!(path = %path, "finalized");
        self.completed.insert(path);
    }

    /// True when `path` has finished.
    pub(crate) fn is_finalized(&self, path: &Path) -> bool {
        self.completed.contains(path)
    }

    /// True when every path that arrived before `path` has finished.
    ///
    /// The walk stops at `path` itself, so a pending step is not gated on
    /// its own arrival. A path that never arrived gates on the entire
    /// sequence.
    pub(crate) fn all_preceding_complete(&self, path: &Path) -> bool {
        for entry in &self.arrivals {
            if entry == path {
                return true;
            }
            if !self.completed.contains(entry) {
                return false;
            }
        }
        true
    }

    /// True when every path that arrived before position `index` has
    /// finished.
    pub(crate) fn all_complete_before(&self, index: usize) -> bool {
        self.arrivals
            .iter()
            .take(index)
            .all(|entry| self.completed.contains(entry))
    }

    /// True when every path reached so far has finished.
    pub(crate) fn all_complete(&self) -> bool {
        self.arrivals
            .iter()
            .all(|entry| self.completed.contains(entry))
    }

    /// Position `path` held in the arrival order when first asked.
    ///
    /// Memoized on the first call. Composites query this before their own
    /// arrival is recorded, and the remembered boundary must not move as
    /// their children arrive behind it.
    pub(crate) fn first_seen_index(&mut self, path: &Path) -> usize {
        if let Some(&index) = self.first_seen.get(path) {
            return index;
        }
        let index = self.arrivals.len();
        self.first_seen.insert(path.clone(), index);
        index
    }

    /// Deadline for `path`, fixing the value of `deadline()` on first reach.
    ///
    /// Never changes an existing entry: re-polls compare against the
    /// original deadline, so a wait cannot restart itself.
    pub(crate) fn deadline_for(&mut self, path: &Path, deadline: impl FnOnce() -> Time) -> Time {
        if let Some(&existing) = self.deadlines.get(path) {
            return existing;
        }
        let fixed = deadline();
        tracing::trace!(path = %path, deadline = %fixed, "deadline fixed");
        self.deadlines.insert(path.clone(), fixed);
        fixed
    }

    /// Number of paths that have arrived.
    pub(crate) fn arrival_count(&self) -> usize {
        self.arrivals.len()
    }

    /// Number of paths that have finished.
    pub(crate) fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Forgets everything.
    pub(crate) fn clear(&mut self) {
        self.completed.clear();
        self.arrivals.clear();
        self.first_seen.clear();
        self.deadlines.clear();
    }
}
