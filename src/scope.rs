//! Live nesting state.
//!
//! While a poll is inside composite constructs, the stack holds one frame
//! per enclosing construct. Between polls it is empty: the stack carries no
//! memory, it only shapes the paths of whatever the current replay pass
//! reaches. Persistence is the ledger's job.

use crate::path::{Frame, Path};
use smallvec::SmallVec;

/// The stack of composite frames the current poll is inside.
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    frames: SmallVec<[Frame; 8]>,
}

impl ScopeStack {
    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pops one frame. Tolerates an empty stack so that a reset from inside
    /// a body leaves the unwinding guards nothing to trip over.
    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    /// Path of the enclosing frames plus `leaf`.
    pub(crate) fn leaf_path(&self, leaf: Frame) -> Path {
        let mut path: Path = self.frames.iter().copied().collect();
        path.push(leaf);
        path
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }
}
