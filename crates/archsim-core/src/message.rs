//! Messages exchanged between the core and surrounding resources.
//!
//! Producers and consumers of transfers do not touch the pool or the
//! stations directly; they post [`Message`]s which the simulation
//! dispatches at the start of the next tick, in posting order.

use crate::id::{ArbiterId, BufferId, ClientId, MemoryId, RequesterId, StationId};

/// Wire description of a buffer carried by a `buffer_transfer` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Pool-assigned id.
    pub id: BufferId,
    /// Size in bytes.
    pub size: u64,
    /// Payload bytes, when the sender chose to ship them.
    pub content: Option<Vec<u8>>,
}

impl BufferDescriptor {
    /// A descriptor carrying only id and size.
    pub fn new(id: BufferId, size: u64) -> Self {
        Self {
            id,
            size,
            content: None,
        }
    }
}

/// A boundary message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Move a buffer to `destination` through `arbiter` on behalf of
    /// `requester`. The destination takes ownership once the channel
    /// model reports arrival.
    BufferTransfer {
        /// The buffer to move.
        buffer: BufferDescriptor,
        /// The upstream requester issuing the transfer.
        requester: RequesterId,
        /// The arbiter merging this requester onto its downstream channel.
        arbiter: ArbiterId,
        /// The memory that takes ownership on arrival.
        destination: MemoryId,
    },
    /// Free a buffer.
    BufferConsume {
        /// The buffer to free.
        buffer_id: BufferId,
    },
    /// Wait on a semaphore.
    SemWait {
        /// The station addressed.
        station: StationId,
        /// Semaphore index within the station.
        index: usize,
        /// The party to grant.
        client: ClientId,
    },
    /// Signal a semaphore.
    SemSignal {
        /// The station addressed.
        station: StationId,
        /// Semaphore index within the station.
        index: usize,
    },
}

impl Message {
    /// The message kind as named at the boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BufferTransfer { .. } => "buffer_transfer",
            Self::BufferConsume { .. } => "buffer_consume",
            Self::SemWait { .. } => "sem_wait",
            Self::SemSignal { .. } => "sem_signal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_boundary_names() {
        let transfer = Message::BufferTransfer {
            buffer: BufferDescriptor::new(BufferId(0), 64),
            requester: "cpu0".into(),
            arbiter: "arb".into(),
            destination: "memory".into(),
        };
        assert_eq!(transfer.kind(), "buffer_transfer");
        assert_eq!(
            Message::BufferConsume {
                buffer_id: BufferId(0)
            }
            .kind(),
            "buffer_consume"
        );
        assert_eq!(
            Message::SemWait {
                station: "sem".into(),
                index: 0,
                client: "rec".into(),
            }
            .kind(),
            "sem_wait"
        );
        assert_eq!(
            Message::SemSignal {
                station: "sem".into(),
                index: 0,
            }
            .kind(),
            "sem_signal"
        );
    }
}
