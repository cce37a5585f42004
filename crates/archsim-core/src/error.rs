//! Error types for the archsim core.
//!
//! One enum per subsystem: buffer pool, channel, arbiter, semaphore
//! station, and trigger descriptors. Every error reports an
//! [`ErrorClass`] so callers can tell a missing configuration from a
//! dangling buffer reference from a buffer that already finished.

use std::error::Error;
use std::fmt;

use crate::id::{ArbiterId, BufferId, ChannelId, RequesterId, StationId};
use crate::state::BufferState;

/// Coarse classification shared by all archsim errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// A component is missing, mis-sized, or wired inconsistently.
    Configuration,
    /// An identifier does not name anything registered.
    Lookup,
    /// The buffer exists but has already been deallocated.
    Ownership,
    /// The requested state transition is out of lifecycle order.
    Lifecycle,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Lookup => write!(f, "lookup"),
            Self::Ownership => write!(f, "ownership"),
            Self::Lifecycle => write!(f, "lifecycle"),
        }
    }
}

// ── PoolError ──────────────────────────────────────────────────────

/// Errors from buffer pool operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// No buffer with this id was ever created.
    UnknownBuffer {
        /// The unrecognised id.
        id: BufferId,
    },
    /// The buffer exists but is already deallocated.
    AlreadyDeallocated {
        /// The deallocated buffer.
        id: BufferId,
    },
    /// The transition would move the buffer backward or out of order.
    InvalidTransition {
        /// The buffer being transitioned.
        id: BufferId,
        /// Its current state.
        from: BufferState,
        /// The requested state.
        to: BufferState,
    },
    /// Buffers must hold at least one byte.
    ZeroSize,
    /// Caller-supplied content does not match the declared size.
    ContentLength {
        /// Declared buffer size in bytes.
        expected: u64,
        /// Length of the supplied content.
        actual: usize,
    },
    /// A trigger was registered for a state the buffer has already passed.
    TriggerUnreachable {
        /// The buffer the trigger was registered on.
        id: BufferId,
        /// The state the trigger fires on.
        on: BufferState,
        /// The buffer's current state.
        current: BufferState,
    },
    /// A boundary descriptor disagrees with the pool's record of the
    /// buffer it names.
    DescriptorMismatch {
        /// The buffer named by the descriptor.
        id: BufferId,
        /// Which field differs (`"size"` or `"content"`).
        field: &'static str,
    },
}

impl PoolError {
    /// The error's classification.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownBuffer { .. } | Self::DescriptorMismatch { .. } => ErrorClass::Lookup,
            Self::AlreadyDeallocated { .. } => ErrorClass::Ownership,
            Self::InvalidTransition { .. } | Self::TriggerUnreachable { .. } => {
                ErrorClass::Lifecycle
            }
            Self::ZeroSize | Self::ContentLength { .. } => ErrorClass::Configuration,
        }
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownBuffer { id } => write!(f, "unknown buffer id: {id}"),
            Self::AlreadyDeallocated { id } => write!(f, "buffer {id} is already deallocated"),
            Self::InvalidTransition { id, from, to } => {
                write!(f, "buffer {id} cannot move from {from} to {to}")
            }
            Self::ZeroSize => write!(f, "buffer size must be at least 1 byte"),
            Self::ContentLength { expected, actual } => {
                write!(
                    f,
                    "buffer content is {actual} bytes but size is {expected} bytes"
                )
            }
            Self::TriggerUnreachable { id, on, current } => {
                write!(
                    f,
                    "buffer {id} is already {current}; a trigger on {on} would never fire"
                )
            }
            Self::DescriptorMismatch { id, field } => {
                write!(f, "descriptor for buffer {id} has a different {field} than the pool")
            }
        }
    }
}

impl Error for PoolError {}

// ── ChannelError ───────────────────────────────────────────────────

/// Errors from channel configuration and transfer admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelError {
    /// Bandwidth must be positive.
    ZeroBandwidth {
        /// The misconfigured channel.
        channel: ChannelId,
    },
    /// The transfer mode cannot change while transfers are in flight.
    ModeChangeWhileBusy {
        /// The busy channel.
        channel: ChannelId,
    },
    /// A transfer must carry at least one byte.
    ZeroSizeTransfer {
        /// The channel the transfer was offered to.
        channel: ChannelId,
        /// The offending buffer.
        buffer: BufferId,
    },
    /// The buffer already has a transfer on this channel.
    DuplicateTransfer {
        /// The channel.
        channel: ChannelId,
        /// The buffer already in flight.
        buffer: BufferId,
    },
}

impl ChannelError {
    /// The error's classification.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateTransfer { .. } => ErrorClass::Lifecycle,
            _ => ErrorClass::Configuration,
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBandwidth { channel } => {
                write!(f, "channel '{channel}' bandwidth must be > 0")
            }
            Self::ModeChangeWhileBusy { channel } => {
                write!(
                    f,
                    "channel '{channel}' cannot change transfer mode with transfers in flight"
                )
            }
            Self::ZeroSizeTransfer { channel, buffer } => {
                write!(f, "channel '{channel}' refused empty transfer of {buffer}")
            }
            Self::DuplicateTransfer { channel, buffer } => {
                write!(f, "{buffer} is already in flight on channel '{channel}'")
            }
        }
    }
}

impl Error for ChannelError {}

// ── ArbiterError ───────────────────────────────────────────────────

/// Errors from arbiter configuration and request handling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArbiterError {
    /// `request` was called before a downstream channel was attached.
    NoDownstream {
        /// The unconfigured arbiter.
        arbiter: ArbiterId,
    },
    /// The requester is not registered as an upstream of this arbiter.
    UnknownRequester {
        /// The arbiter.
        arbiter: ArbiterId,
        /// The unregistered requester.
        requester: RequesterId,
    },
    /// The channel is already driven by an arbiter of a different mode.
    ModeConflict {
        /// The arbiter being attached.
        arbiter: ArbiterId,
        /// The contested channel.
        channel: ChannelId,
    },
    /// The downstream channel rejected the transfer.
    Channel(ChannelError),
    /// The buffer pool rejected the state change.
    Pool(PoolError),
}

impl ArbiterError {
    /// The error's classification.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoDownstream { .. } | Self::ModeConflict { .. } => ErrorClass::Configuration,
            Self::UnknownRequester { .. } => ErrorClass::Lookup,
            Self::Channel(e) => e.class(),
            Self::Pool(e) => e.class(),
        }
    }
}

impl fmt::Display for ArbiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDownstream { arbiter } => {
                write!(f, "arbiter '{arbiter}' has no downstream channel attached")
            }
            Self::UnknownRequester { arbiter, requester } => {
                write!(
                    f,
                    "requester '{requester}' is not an upstream of arbiter '{arbiter}'"
                )
            }
            Self::ModeConflict { arbiter, channel } => {
                write!(
                    f,
                    "arbiter '{arbiter}' cannot share channel '{channel}' with an arbiter of another mode"
                )
            }
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Pool(e) => write!(f, "pool: {e}"),
        }
    }
}

impl Error for ArbiterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Channel(e) => Some(e),
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChannelError> for ArbiterError {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

impl From<PoolError> for ArbiterError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

// ── SemaphoreError ─────────────────────────────────────────────────

/// Errors from semaphore station operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SemaphoreError {
    /// A station needs at least one semaphore.
    ZeroCount {
        /// The misconfigured station.
        station: StationId,
    },
    /// The semaphore index is outside `[0, count)`.
    IndexOutOfRange {
        /// The station addressed.
        station: StationId,
        /// The requested index.
        index: usize,
        /// Number of semaphores in the station.
        count: usize,
    },
}

impl SemaphoreError {
    /// The error's classification. Always [`ErrorClass::Configuration`].
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}

impl fmt::Display for SemaphoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCount { station } => {
                write!(f, "station '{station}' needs at least one semaphore")
            }
            Self::IndexOutOfRange {
                station,
                index,
                count,
            } => {
                write!(
                    f,
                    "semaphore index {index} out of range [0,{count}) on station '{station}'"
                )
            }
        }
    }
}

impl Error for SemaphoreError {}

// ── TriggerError ───────────────────────────────────────────────────

/// Errors from parsing or resolving a trigger descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriggerError {
    /// The `on` field does not name a lifecycle state.
    UnknownState {
        /// The unrecognised name.
        name: String,
    },
    /// The `action` field is neither `signal` nor `wait`.
    UnknownAction {
        /// The unrecognised action.
        name: String,
    },
    /// The semaphore index is negative.
    NegativeIndex {
        /// The supplied index.
        index: i64,
    },
    /// The descriptor is not valid JSON of the expected shape.
    Malformed {
        /// Parser diagnostic.
        reason: String,
    },
}

impl TriggerError {
    /// The error's classification. Always [`ErrorClass::Configuration`].
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownState { name } => write!(f, "unknown buffer state '{name}'"),
            Self::UnknownAction { name } => {
                write!(f, "unknown trigger action '{name}' (expected signal or wait)")
            }
            Self::NegativeIndex { index } => write!(f, "semaphore index {index} is negative"),
            Self::Malformed { reason } => write!(f, "malformed trigger descriptor: {reason}"),
        }
    }
}

impl Error for TriggerError {}
