//! Call-site identity.
//!
//! Every primitive on a routine is `#[track_caller]`: the compiler threads
//! the caller's source location through the call, and that location is the
//! stable identity of the step across polls. Because identity is textual,
//! the same line reached on poll one and on poll one thousand names the same
//! step, which is what lets a replayed body skip work it already finished.
//!
//! One caveat follows from the mechanism: a plain helper function that wraps
//! a primitive collapses every caller onto the helper's own line. Helpers
//! that should stay transparent must themselves be `#[track_caller]`.

use core::fmt;
use core::panic::Location;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A stable identifier for one textual call site.
///
/// Two calls made from the same file, line, and column produce equal IDs on
/// every poll, in every routine, for the life of the process. The ID is a
/// 64-bit FNV-1a digest of the location, so equality and hashing cost one
/// word comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(u64);

impl SiteId {
    /// Returns the identity of the calling source location.
    ///
    /// Resolves through consecutive `#[track_caller]` frames to the nearest
    /// untracked caller, so primitives that call this internally report the
    /// user's line, not their own.
    #[must_use]
    #[track_caller]
    pub fn here() -> Self {
        Self::from_location(Location::caller())
    }

    /// Builds an identity from an explicit location.
    ///
    /// The digest covers file, line, and column. Location references
    /// themselves are not guaranteed unique per site by the standard
    /// library, so the contents are hashed rather than the address.
    #[must_use]
    pub fn from_location(location: &Location<'_>) -> Self {
        let mut hash = FNV_OFFSET;
        for byte in location.file().as_bytes() {
            hash = (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME);
        }
        hash = (hash ^ u64::from(location.line())).wrapping_mul(FNV_PRIME);
        hash = (hash ^ u64::from(location.column())).wrapping_mul(FNV_PRIME);
        Self(hash)
    }

    /// Returns the raw 64-bit digest.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SiteId({:016x})", self.0)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{:08x}", self.0 & 0xffff_ffff)
    }
}
