//! The [`DataBuffer`] record.

use archsim_core::{BufferId, BufferState, MemoryId, TickId};
use smallvec::SmallVec;

use crate::trigger::{FiredTrigger, Trigger};

/// A trigger waiting for its state.
#[derive(Clone, Debug)]
pub(crate) struct ArmedTrigger {
    pub(crate) seq: u64,
    pub(crate) trigger: Trigger,
}

/// A sized unit of data moving between memories.
///
/// Read-only outside the pool; every mutation goes through
/// [`BufferPool`](crate::BufferPool).
#[derive(Clone, Debug)]
pub struct DataBuffer {
    id: BufferId,
    size: u64,
    content: Vec<u8>,
    pub(crate) owner: Option<MemoryId>,
    pub(crate) state: BufferState,
    /// Where the buffer is headed while in transit.
    pub(crate) destination: Option<MemoryId>,
    history: SmallVec<[(BufferState, TickId); 6]>,
    pub(crate) armed: SmallVec<[ArmedTrigger; 2]>,
}

impl DataBuffer {
    pub(crate) fn new(
        id: BufferId,
        size: u64,
        content: Vec<u8>,
        owner: Option<MemoryId>,
        tick: TickId,
    ) -> Self {
        let mut history = SmallVec::new();
        history.push((BufferState::Allocated, tick));
        Self {
            id,
            size,
            content,
            owner,
            state: BufferState::Allocated,
            destination: None,
            history,
            armed: SmallVec::new(),
        }
    }

    /// Pool-assigned id.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Payload bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The memory currently holding the buffer.
    pub fn owner(&self) -> Option<&MemoryId> {
        self.owner.as_ref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// The destination of an in-flight transfer.
    pub fn destination(&self) -> Option<&MemoryId> {
        self.destination.as_ref()
    }

    /// Every state entered so far with the tick it was entered.
    pub fn history(&self) -> &[(BufferState, TickId)] {
        &self.history
    }

    /// Tick the buffer entered `state`, if it has.
    pub fn entered_at(&self, state: BufferState) -> Option<TickId> {
        self.history
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, t)| *t)
    }

    /// Triggers not yet fired, in registration order.
    pub fn pending_triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.armed.iter().map(|a| &a.trigger)
    }

    /// Enter `next` and move the triggers armed on it into `fired`.
    pub(crate) fn enter(&mut self, next: BufferState, tick: TickId, fired: &mut Vec<FiredTrigger>) {
        debug_assert!(next > self.state);
        self.state = next;
        self.history.push((next, tick));
        let id = self.id;
        let mut i = 0;
        while i < self.armed.len() {
            if self.armed[i].trigger.on == next {
                let armed = self.armed.remove(i);
                fired.push(FiredTrigger {
                    buffer: id,
                    trigger: armed.trigger,
                    tick,
                    seq: armed.seq,
                });
            } else {
                i += 1;
            }
        }
    }
}
