//! The [`BufferPool`] registry and lifecycle state machine.

use archsim_core::{BufferId, BufferState, MemoryId, PoolError, TickId};
use indexmap::IndexMap;
use tracing::debug;

use crate::buffer::{ArmedTrigger, DataBuffer};
use crate::config::PoolConfig;
use crate::content::ContentSource;
use crate::trigger::{FiredTrigger, Trigger};

/// When an in-flight buffer is due, as last reported by its channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expected {
    /// The memory that takes ownership on arrival.
    pub destination: MemoryId,
    /// Tick the buffer reaches `arrived`.
    pub arrive_at: TickId,
    /// Tick the buffer reaches `responded`, if the channel has a
    /// response leg.
    pub respond_at: Option<TickId>,
}

/// One state change applied by [`BufferPool::resolve_due`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// The buffer.
    pub buffer: BufferId,
    /// State before.
    pub from: BufferState,
    /// State after.
    pub to: BufferState,
}

/// The registry of every buffer in a simulation.
///
/// Ids are assigned sequentially from 0 and never reused. Deallocated
/// buffers stay registered until [`purge_deallocated`](Self::purge_deallocated)
/// so a stale id reports [`PoolError::AlreadyDeallocated`] rather than
/// [`PoolError::UnknownBuffer`].
#[derive(Debug)]
pub struct BufferPool {
    buffers: IndexMap<BufferId, DataBuffer>,
    /// Live bytes held per memory.
    owned_bytes: IndexMap<MemoryId, u64>,
    /// Scheduled arrivals in admission order.
    expected: IndexMap<BufferId, Expected>,
    fired: Vec<FiredTrigger>,
    content: ContentSource,
    next_id: u64,
    next_trigger_seq: u64,
    tick: TickId,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl BufferPool {
    /// Create an empty pool.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            buffers: IndexMap::new(),
            owned_bytes: IndexMap::new(),
            expected: IndexMap::new(),
            fired: Vec::new(),
            content: ContentSource::new(config.seed, config.random_content_cap),
            next_id: 0,
            next_trigger_seq: 0,
            tick: TickId(0),
        }
    }

    /// The tick stamped on transitions.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Set the tick stamped on subsequent transitions.
    pub fn set_tick(&mut self, tick: TickId) {
        self.tick = tick;
    }

    // ── Creation and lookup ────────────────────────────────────────

    /// Register a new buffer in `allocated`.
    ///
    /// `content` defaults to seeded random bytes. `owner` may be `None`
    /// for a buffer not yet placed in any memory.
    pub fn create(
        &mut self,
        size: u64,
        content: Option<Vec<u8>>,
        owner: Option<MemoryId>,
    ) -> Result<BufferId, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroSize);
        }
        let content = match content {
            Some(bytes) => {
                if bytes.len() as u64 != size {
                    return Err(PoolError::ContentLength {
                        expected: size,
                        actual: bytes.len(),
                    });
                }
                bytes
            }
            None => {
                let len = usize::try_from(size).map_err(|_| PoolError::ContentLength {
                    expected: size,
                    actual: 0,
                })?;
                self.content.generate(len)
            }
        };
        let id = BufferId(self.next_id);
        self.next_id += 1;
        if let Some(owner) = &owner {
            *self.owned_bytes.entry(owner.clone()).or_insert(0) += size;
        }
        debug!(buffer = %id, size, owner = ?owner.as_ref().map(MemoryId::as_str), "buffer created");
        self.buffers
            .insert(id, DataBuffer::new(id, size, content, owner, self.tick));
        Ok(id)
    }

    /// The buffer, live or deallocated.
    pub fn get(&self, id: BufferId) -> Result<&DataBuffer, PoolError> {
        self.buffers.get(&id).ok_or(PoolError::UnknownBuffer { id })
    }

    /// The buffer, if registered.
    pub fn buffer(&self, id: BufferId) -> Option<&DataBuffer> {
        self.buffers.get(&id)
    }

    /// Current state of a registered buffer.
    pub fn state(&self, id: BufferId) -> Result<BufferState, PoolError> {
        self.get(id).map(DataBuffer::state)
    }

    /// Current owner of a registered buffer.
    pub fn owner(&self, id: BufferId) -> Result<Option<&MemoryId>, PoolError> {
        self.get(id).map(DataBuffer::owner)
    }

    /// Iterate over registered buffers in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &DataBuffer> {
        self.buffers.values()
    }

    /// Number of registered buffers, deallocated included.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether no buffer is registered.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Number of buffers not yet deallocated.
    pub fn live_count(&self) -> usize {
        self.buffers.values().filter(|b| b.state.is_live()).count()
    }

    /// Sum of `size` over live buffers currently owned by `memory`.
    pub fn total_allocated_bytes(&self, memory: &MemoryId) -> u64 {
        self.owned_bytes.get(memory).copied().unwrap_or(0)
    }

    /// Sum of `size` over all live buffers, owned or not.
    pub fn total_bytes(&self) -> u64 {
        self.buffers
            .values()
            .filter(|b| b.state.is_live())
            .map(DataBuffer::size)
            .sum()
    }

    /// Drop deallocated buffers from the registry. Returns how many
    /// were removed. Their ids become unknown.
    pub fn purge_deallocated(&mut self) -> usize {
        let before = self.buffers.len();
        self.buffers.retain(|_, b| b.state.is_live());
        before - self.buffers.len()
    }

    // ── Transitions ────────────────────────────────────────────────

    /// `allocated → transit`: an arbiter admitted the buffer toward
    /// `destination`. The source keeps ownership until arrival.
    pub fn begin_transit(&mut self, id: BufferId, destination: MemoryId) -> Result<(), PoolError> {
        let buf = self.live_mut(id)?;
        if buf.state != BufferState::Allocated {
            return Err(PoolError::InvalidTransition {
                id,
                from: buf.state,
                to: BufferState::Transit,
            });
        }
        buf.destination = Some(destination);
        self.walk_to(id, BufferState::Transit)
    }

    /// `allocated | transit → arrived`, handing ownership to `destination`.
    pub fn transfer(&mut self, id: BufferId, destination: MemoryId) -> Result<(), PoolError> {
        let buf = self.live_mut(id)?;
        if buf.state > BufferState::Transit {
            return Err(PoolError::InvalidTransition {
                id,
                from: buf.state,
                to: BufferState::Arrived,
            });
        }
        buf.destination = Some(destination);
        self.expected.shift_remove(&id);
        self.walk_to(id, BufferState::Arrived)
    }

    /// `arrived → responded`.
    pub fn respond(&mut self, id: BufferId) -> Result<(), PoolError> {
        let buf = self.live_mut(id)?;
        if buf.state != BufferState::Arrived {
            return Err(PoolError::InvalidTransition {
                id,
                from: buf.state,
                to: BufferState::Responded,
            });
        }
        self.walk_to(id, BufferState::Responded)
    }

    /// `arrived | responded → inuse`.
    pub fn begin_use(&mut self, id: BufferId) -> Result<(), PoolError> {
        let buf = self.live_mut(id)?;
        if !matches!(buf.state, BufferState::Arrived | BufferState::Responded) {
            return Err(PoolError::InvalidTransition {
                id,
                from: buf.state,
                to: BufferState::InUse,
            });
        }
        self.expected.shift_remove(&id);
        self.walk_to(id, BufferState::InUse)
    }

    /// Deallocate the buffer and clear its owner.
    ///
    /// Legal from any state except `transit`. Triggers armed on states
    /// the buffer skips are dropped without firing.
    pub fn consume(&mut self, id: BufferId) -> Result<(), PoolError> {
        let tick = self.tick;
        let buf = live_entry(&mut self.buffers, id)?;
        if buf.state == BufferState::Transit {
            return Err(PoolError::InvalidTransition {
                id,
                from: buf.state,
                to: BufferState::Deallocated,
            });
        }
        let size = buf.size();
        let owner = buf.owner.take();
        buf.destination = None;
        buf.enter(BufferState::Deallocated, tick, &mut self.fired);
        buf.armed.clear();
        if let Some(owner) = &owner {
            self.release_bytes(owner, size);
        }
        self.expected.shift_remove(&id);
        debug!(buffer = %id, tick = %tick, "buffer deallocated");
        Ok(())
    }

    // ── Triggers ───────────────────────────────────────────────────

    /// Arm `trigger` on a buffer. Returns its registration sequence.
    ///
    /// The trigger's state must still lie ahead of the buffer.
    pub fn add_trigger(&mut self, id: BufferId, trigger: Trigger) -> Result<u64, PoolError> {
        let seq = self.next_trigger_seq;
        let buf = self.live_mut(id)?;
        if trigger.on <= buf.state {
            return Err(PoolError::TriggerUnreachable {
                id,
                on: trigger.on,
                current: buf.state,
            });
        }
        buf.armed.push(ArmedTrigger { seq, trigger });
        self.next_trigger_seq += 1;
        Ok(seq)
    }

    /// Drain fired triggers, ordered by tick, then state, then
    /// registration.
    pub fn take_fired(&mut self) -> Vec<FiredTrigger> {
        let mut fired = std::mem::take(&mut self.fired);
        fired.sort_by_key(|f| (f.tick, f.trigger.on, f.seq));
        fired
    }

    /// Whether fired triggers are waiting to be drained.
    pub fn has_fired(&self) -> bool {
        !self.fired.is_empty()
    }

    // ── Scheduled arrivals ─────────────────────────────────────────

    /// Record or replace when an in-flight buffer is due.
    pub fn record_expected(&mut self, id: BufferId, expected: Expected) -> Result<(), PoolError> {
        let buf = self.live_mut(id)?;
        if buf.state != BufferState::Transit {
            return Err(PoolError::InvalidTransition {
                id,
                from: buf.state,
                to: BufferState::Arrived,
            });
        }
        buf.destination = Some(expected.destination.clone());
        if let Some(slot) = self.expected.get_mut(&id) {
            *slot = expected;
        } else {
            self.expected.insert(id, expected);
        }
        Ok(())
    }

    /// The recorded schedule for `id`, if any.
    pub fn expected(&self, id: BufferId) -> Option<&Expected> {
        self.expected.get(&id)
    }

    /// The recorded arrival tick for `id`, if any.
    pub fn expected_arrival(&self, id: BufferId) -> Option<TickId> {
        self.expected.get(&id).map(|e| e.arrive_at)
    }

    /// Buffers with a recorded schedule still outstanding.
    pub fn pending_arrivals(&self) -> usize {
        self.expected.len()
    }

    /// Apply every arrival and response due at or before `now`, in
    /// admission order. Sets the pool's tick to `now`.
    pub fn resolve_due(&mut self, now: TickId) -> Result<Vec<Transition>, PoolError> {
        self.tick = now;
        let due: Vec<BufferId> = self
            .expected
            .iter()
            .filter(|(_, e)| e.arrive_at <= now || e.respond_at.is_some_and(|r| r <= now))
            .map(|(id, _)| *id)
            .collect();

        let mut applied = Vec::new();
        for id in due {
            let Some(expected) = self.expected.get(&id).cloned() else {
                continue;
            };
            let from = self.state(id)?;
            if from == BufferState::Transit && expected.arrive_at <= now {
                self.walk_to(id, BufferState::Arrived)?;
            }
            let mut to = self.state(id)?;
            match expected.respond_at {
                Some(respond_at) if respond_at <= now && to == BufferState::Arrived => {
                    self.walk_to(id, BufferState::Responded)?;
                    to = BufferState::Responded;
                    self.expected.shift_remove(&id);
                }
                Some(_) => {}
                None => {
                    self.expected.shift_remove(&id);
                }
            }
            if from != to {
                applied.push(Transition {
                    buffer: id,
                    from,
                    to,
                });
            }
        }
        Ok(applied)
    }

    // ── Internals ──────────────────────────────────────────────────

    fn live_mut(&mut self, id: BufferId) -> Result<&mut DataBuffer, PoolError> {
        live_entry(&mut self.buffers, id)
    }

    /// Step forward one state at a time until `target`, firing triggers.
    fn walk_to(&mut self, id: BufferId, target: BufferState) -> Result<(), PoolError> {
        let tick = self.tick;
        let buf = live_entry(&mut self.buffers, id)?;
        if target <= buf.state {
            return Err(PoolError::InvalidTransition {
                id,
                from: buf.state,
                to: target,
            });
        }
        let size = buf.size();
        let mut handoff = None;
        while buf.state < target {
            let Some(next) = buf.state.successor() else {
                break;
            };
            if next == BufferState::Arrived {
                if let Some(dest) = buf.destination.take() {
                    handoff = Some((buf.owner.replace(dest.clone()), dest));
                }
            }
            buf.enter(next, tick, &mut self.fired);
            debug!(buffer = %id, state = %next, tick = %tick, "buffer transition");
        }
        if let Some((previous, dest)) = handoff {
            if let Some(previous) = &previous {
                self.release_bytes(previous, size);
            }
            *self.owned_bytes.entry(dest).or_insert(0) += size;
        }
        Ok(())
    }

    fn release_bytes(&mut self, memory: &MemoryId, size: u64) {
        if let Some(bytes) = self.owned_bytes.get_mut(memory) {
            *bytes = bytes.saturating_sub(size);
        }
    }
}

fn live_entry(
    buffers: &mut IndexMap<BufferId, DataBuffer>,
    id: BufferId,
) -> Result<&mut DataBuffer, PoolError> {
    let buf = buffers.get_mut(&id).ok_or(PoolError::UnknownBuffer { id })?;
    if !buf.state.is_live() {
        return Err(PoolError::AlreadyDeallocated { id });
    }
    Ok(buf)
}
