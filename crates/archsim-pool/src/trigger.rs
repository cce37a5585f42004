//! Lifecycle triggers and their external descriptor form.
//!
//! A trigger couples one buffer state to one semaphore operation. The
//! action set is closed ([`TriggerAction`]), so a descriptor naming an
//! unknown action or state is rejected when it is parsed rather than
//! when it would fire.

use std::fmt;
use std::str::FromStr;

use archsim_core::{BufferId, BufferState, StationId, TickId, TriggerError};
use serde::{Deserialize, Serialize};

/// The semaphore operation a trigger performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerAction {
    /// Signal the semaphore.
    Signal,
    /// Wait on the semaphore, with the buffer as the waiting client.
    Wait,
}

impl TriggerAction {
    /// The name used in descriptors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Wait => "wait",
        }
    }
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerAction {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signal" => Ok(Self::Signal),
            "wait" => Ok(Self::Wait),
            other => Err(TriggerError::UnknownAction {
                name: other.to_string(),
            }),
        }
    }
}

/// A semaphore operation armed on a buffer state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Trigger {
    /// The state whose entry fires the trigger.
    pub on: BufferState,
    /// The operation to perform.
    pub action: TriggerAction,
    /// The station addressed.
    pub station: StationId,
    /// Semaphore index within the station.
    pub index: usize,
}

impl Trigger {
    /// A trigger that signals `station[index]` when the buffer enters `on`.
    pub fn signal(on: BufferState, station: impl Into<StationId>, index: usize) -> Self {
        Self {
            on,
            action: TriggerAction::Signal,
            station: station.into(),
            index,
        }
    }

    /// A trigger that waits on `station[index]` when the buffer enters `on`.
    pub fn wait(on: BufferState, station: impl Into<StationId>, index: usize) -> Self {
        Self {
            on,
            action: TriggerAction::Wait,
            station: station.into(),
            index,
        }
    }
}

/// A trigger that has fired and awaits application to its station.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FiredTrigger {
    /// The buffer whose transition fired it.
    pub buffer: BufferId,
    /// The trigger itself.
    pub trigger: Trigger,
    /// Tick of the transition.
    pub tick: TickId,
    /// Pool-wide registration order.
    pub seq: u64,
}

/// The external JSON form of a trigger:
/// `{"on": "arrived", "action": "signal", "station": "sem", "index": 3}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerDescriptor {
    /// State name.
    pub on: String,
    /// `"signal"` or `"wait"`.
    pub action: String,
    /// Station name.
    pub station: String,
    /// Semaphore index.
    pub index: i64,
}

impl TriggerDescriptor {
    /// Parse a descriptor from JSON without validating its fields.
    pub fn from_json(json: &str) -> Result<Self, TriggerError> {
        serde_json::from_str(json).map_err(|e| TriggerError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, TriggerError> {
        serde_json::to_string(self).map_err(|e| TriggerError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Parse and validate in one step.
    pub fn parse(json: &str) -> Result<Trigger, TriggerError> {
        Self::from_json(json)?.try_into()
    }
}

impl TryFrom<TriggerDescriptor> for Trigger {
    type Error = TriggerError;

    fn try_from(d: TriggerDescriptor) -> Result<Self, Self::Error> {
        let on = d.on.parse::<BufferState>()?;
        let action = d.action.parse::<TriggerAction>()?;
        let index = usize::try_from(d.index)
            .map_err(|_| TriggerError::NegativeIndex { index: d.index })?;
        if d.station.is_empty() {
            return Err(TriggerError::Malformed {
                reason: "station name is empty".to_string(),
            });
        }
        Ok(Trigger {
            on,
            action,
            station: StationId::from(d.station),
            index,
        })
    }
}

impl From<&Trigger> for TriggerDescriptor {
    fn from(t: &Trigger) -> Self {
        Self {
            on: t.on.as_str().to_string(),
            action: t.action.as_str().to_string(),
            station: t.station.as_str().to_string(),
            index: i64::try_from(t.index).unwrap_or(i64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_descriptor() {
        let t = TriggerDescriptor::parse(
            r#"{"on": "arrived", "action": "signal", "station": "sem", "index": 3}"#,
        )
        .unwrap();
        assert_eq!(t, Trigger::signal(BufferState::Arrived, "sem", 3));
    }

    #[test]
    fn inuse_state_name() {
        let t = TriggerDescriptor::parse(
            r#"{"on": "inuse", "action": "wait", "station": "gate", "index": 0}"#,
        )
        .unwrap();
        assert_eq!(t.on, BufferState::InUse);
        assert_eq!(t.action, TriggerAction::Wait);
    }

    #[test]
    fn unknown_action_rejected_at_parse() {
        let err = TriggerDescriptor::parse(
            r#"{"on": "arrived", "action": "broadcast", "station": "sem", "index": 0}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TriggerError::UnknownAction {
                name: "broadcast".into()
            }
        );
    }

    #[test]
    fn unknown_state_rejected_at_parse() {
        let err = TriggerDescriptor::parse(
            r#"{"on": "landed", "action": "signal", "station": "sem", "index": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TriggerError::UnknownState { .. }));
    }

    #[test]
    fn negative_index_rejected() {
        let err = TriggerDescriptor::parse(
            r#"{"on": "arrived", "action": "signal", "station": "sem", "index": -1}"#,
        )
        .unwrap_err();
        assert_eq!(err, TriggerError::NegativeIndex { index: -1 });
    }

    #[test]
    fn malformed_json_rejected() {
        let err = TriggerDescriptor::parse(r#"{"on": "arrived"}"#).unwrap_err();
        assert!(matches!(err, TriggerError::Malformed { .. }));
        let err = TriggerDescriptor::parse(
            r#"{"on": "arrived", "action": "signal", "station": "s", "index": 0, "extra": 1}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TriggerError::Malformed { .. }));
    }

    #[test]
    fn descriptor_from_trigger_serializes() {
        let t = Trigger::wait(BufferState::Responded, "sem", 9);
        let json = TriggerDescriptor::from(&t).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"on":"responded","action":"wait","station":"sem","index":9}"#
        );
        assert_eq!(TriggerDescriptor::parse(&json).unwrap(), t);
    }
}
