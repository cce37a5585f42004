//! Strongly-typed identifiers and the [`TickId`] clock.
//!
//! Buffers are numbered by the pool. Every other component is named:
//! names come from the topology description and from trigger
//! descriptors, and their lexicographic order is the deterministic
//! tie-break used by scheduled arbitration.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Discrete simulation time.
///
/// One tick fully resolves before the next begins; all components
/// observe the same tick while it is being processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The tick immediately after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The tick `ticks` after this one, saturating at `u64::MAX`.
    pub fn after(self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    /// Ticks elapsed from `earlier` to `self`, or zero if `earlier` is later.
    pub fn since(self, earlier: TickId) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a data buffer within a buffer pool.
///
/// Assigned sequentially by the pool at creation and never reused
/// within a run, so a deallocated buffer's id stays distinguishable
/// from one that never existed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf-{}", self.0)
    }
}

impl From<u64> for BufferId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

macro_rules! name_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create an identifier from a name.
            pub fn new(name: impl Into<Arc<str>>) -> Self {
                Self(name.into())
            }

            /// The underlying name.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(v: &str) -> Self {
                Self(v.into())
            }
        }

        impl From<String> for $name {
            fn from(v: String) -> Self {
                Self(v.into())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

name_id!(
    /// Names a memory that can own buffers.
    MemoryId
);

name_id!(
    /// Names an upstream requester feeding an arbiter.
    RequesterId
);

name_id!(
    /// Names a timing channel (plain, read bus, or write bus).
    ChannelId
);

name_id!(
    /// Names an arbiter.
    ArbiterId
);

name_id!(
    /// Names a semaphore station. Trigger descriptors refer to stations
    /// by this name.
    StationId
);

name_id!(
    /// Names a semaphore client (the party granted on `wait`).
    ClientId
);

impl From<BufferId> for ClientId {
    /// A buffer waiting through a `wait` trigger is queued under its own id.
    fn from(id: BufferId) -> Self {
        Self::from(id.to_string())
    }
}
