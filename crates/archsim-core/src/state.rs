//! The data-buffer lifecycle.

use std::fmt;
use std::str::FromStr;

use crate::error::TriggerError;

/// Lifecycle state of a data buffer.
///
/// States are totally ordered; a buffer only ever moves forward
/// through them:
///
/// ```text
/// Allocated → Transit → Arrived → Responded → InUse → Deallocated
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferState {
    /// Created and held by its originating memory, not yet moving.
    Allocated,
    /// Admitted by an arbiter; in flight to its destination. The source
    /// still owns it.
    Transit,
    /// Reached its destination memory, which now owns it.
    Arrived,
    /// The response leg (read data return, write acknowledgement) completed.
    Responded,
    /// A compute resource has begun consuming it.
    InUse,
    /// Terminal. No owner.
    Deallocated,
}

impl BufferState {
    /// All states in lifecycle order.
    pub const ALL: [BufferState; 6] = [
        BufferState::Allocated,
        BufferState::Transit,
        BufferState::Arrived,
        BufferState::Responded,
        BufferState::InUse,
        BufferState::Deallocated,
    ];

    /// The state that follows this one, or `None` for `Deallocated`.
    pub fn successor(self) -> Option<BufferState> {
        match self {
            Self::Allocated => Some(Self::Transit),
            Self::Transit => Some(Self::Arrived),
            Self::Arrived => Some(Self::Responded),
            Self::Responded => Some(Self::InUse),
            Self::InUse => Some(Self::Deallocated),
            Self::Deallocated => None,
        }
    }

    /// Whether a buffer in this state has an owner.
    pub fn is_live(self) -> bool {
        self != Self::Deallocated
    }

    /// The lowercase name used in trigger descriptors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allocated => "allocated",
            Self::Transit => "transit",
            Self::Arrived => "arrived",
            Self::Responded => "responded",
            Self::InUse => "inuse",
            Self::Deallocated => "deallocated",
        }
    }
}

impl fmt::Display for BufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BufferState {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| TriggerError::UnknownState {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_walks_lifecycle_in_order() {
        let mut walked = vec![BufferState::Allocated];
        while let Some(next) = walked.last().and_then(|s| s.successor()) {
            walked.push(next);
        }
        assert_eq!(walked, BufferState::ALL);
    }

    #[test]
    fn ordering_matches_lifecycle() {
        for pair in BufferState::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn parse_round_trips_names() {
        for state in BufferState::ALL {
            assert_eq!(state.as_str().parse::<BufferState>(), Ok(state));
        }
    }

    #[test]
    fn parse_rejects_unknown_name() {
        let err = "landed".parse::<BufferState>().unwrap_err();
        assert_eq!(
            err,
            TriggerError::UnknownState {
                name: "landed".into()
            }
        );
    }

    #[test]
    fn only_deallocated_is_dead() {
        for state in BufferState::ALL {
            assert_eq!(state.is_live(), state != BufferState::Deallocated);
        }
    }
}
