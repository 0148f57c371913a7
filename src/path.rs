//! Execution paths.
//!
//! A path names one point in a routine's control flow: the chain of
//! composite frames live when the point was reached, ending at the point
//! itself. Replay works because the same textual point reproduces the same
//! path on every poll. The frame sequence is itself the encoding, ordered
//! and injective; keeping iteration indices in their own variant means an
//! index can never collide with a call site.

use crate::site::SiteId;
use core::fmt;
use smallvec::SmallVec;

/// One component of a [`Path`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Frame {
    /// The call site of a primitive or composite construct.
    Site(SiteId),
    /// The current index of an iterating construct.
    Index(i64),
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Site(site) => write!(f, "{site}"),
            Self::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// An ordered frame sequence identifying one point in the control flow.
///
/// Paths compare and hash as values. Nesting is rarely deep, so frames are
/// stored inline and typical paths never touch the heap.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(SmallVec<[Frame; 8]>);

impl Path {
    /// Number of frames in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the path has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.0.push(frame);
    }
}

impl FromIterator<Frame> for Path {
    fn from_iter<I: IntoIterator<Item = Frame>>(frames: I) -> Self {
        Self(frames.into_iter().collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for frame in &self.0 {
            write!(f, "/{frame}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}
