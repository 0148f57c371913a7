//! External completion signals.
//!
//! A routine cannot block on outside work; it can only observe, once per
//! poll, whether that work has finished. [`Signal`] is that observation: a
//! cheap, side-effect-free readiness probe. [`Flag`] is the ordinary
//! implementation, a shared boolean the host flips wherever the work
//! actually completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A readiness probe for work completing outside the routine.
///
/// A pending wait finalizes on the first poll that observes `true`. The
/// intended sources are latching, like [`Flag`]: once ready, they stay ready
/// until the host repurposes them.
pub trait Signal {
    /// True once the observed work has finished.
    fn is_ready(&self) -> bool;
}

impl Signal for AtomicBool {
    fn is_ready(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<S: Signal + ?Sized> Signal for &S {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

impl<S: Signal + ?Sized> Signal for Arc<S> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// A cloneable completion flag.
///
/// Clones share one cell; any clone can mark it done, typically from the
/// thread or callback where the external work finishes.
#[derive(Debug, Clone, Default)]
pub struct Flag {
    done: Arc<AtomicBool>,
}

impl Flag {
    /// Creates a flag in the not-done state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the flag done.
    pub fn set(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Returns the flag to the not-done state.
    pub fn reset(&self) {
        self.done.store(false, Ordering::Release);
    }

    /// True once [`set`](Self::set) has been called.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl Signal for Flag {
    fn is_ready(&self) -> bool {
        self.is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_not_done() {
        let flag = Flag::new();
        assert!(!flag.is_ready());
    }

    #[test]
    fn flag_latches_and_resets() {
        let flag = Flag::new();
        flag.set();
        assert!(flag.is_ready());
        flag.reset();
        assert!(!flag.is_ready());
    }

    #[test]
    fn clones_share_one_cell() {
        let flag = Flag::new();
        let other = flag.clone();
        other.set();
        assert!(flag.is_ready());
    }

    #[test]
    fn atomics_and_wrappers_probe_through() {
        let raw = AtomicBool::new(false);
        assert!(!raw.is_ready());
        raw.store(true, Ordering::Release);
        assert!(raw.is_ready());

        let arc: Arc<AtomicBool> = Arc::new(AtomicBool::new(true));
        assert!(arc.is_ready());

        let by_ref: &AtomicBool = &raw;
        assert!(by_ref.is_ready());
    }
}
