//! The single-threaded tick stepper.
//!
//! [`Simulation`] owns every component and the [`BufferPool`] they
//! share, and advances them together one tick at a time. A call to
//! [`Simulation::step`] at tick `T` runs these phases:
//!
//! 1. Dispatch queued [`Message`]s in posting order. Triggers a message
//!    fires are applied before the next message is dispatched.
//! 2. Every arbiter admits its pending requests onto its channel.
//! 3. Every channel moves one tick of data; released transfers are
//!    returned to their arbiters and the remaining expectations are
//!    re-recorded in the pool.
//! 4. The clock becomes `T + 1` and the pool applies every arrival and
//!    response now due.
//! 5. Fired triggers are applied to their stations, ordered by state
//!    then registration.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use archsim_channel::Channel;
use archsim_core::{
    ArbiterError, ArbiterId, BufferId, BufferState, ChannelError, ChannelId, ClientId, ErrorClass,
    MemoryId, Message, PoolError, RequesterId, SemaphoreError, StationId, TickId, TriggerError,
};
use archsim_pool::{
    BufferPool, Expected, FiredTrigger, PoolConfig, Transition, Trigger, TriggerAction,
    TriggerDescriptor,
};
use archsim_semaphore::{SemaphoreStation, SignalOutcome, WaitOutcome};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::arbiter::Arbiter;
use crate::config::{ConfigError, SimConfig};
use crate::memory::{Memory, MemoryConfig, MemoryError};
use crate::metrics::SimMetrics;

// ── SimError ───────────────────────────────────────────────────────

/// Errors surfaced by [`Simulation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimError {
    /// Invalid [`SimConfig`].
    Config(ConfigError),
    /// Buffer pool failure.
    Pool(PoolError),
    /// Channel failure.
    Channel(ChannelError),
    /// Arbiter failure.
    Arbiter(ArbiterError),
    /// Semaphore station failure.
    Semaphore(SemaphoreError),
    /// Trigger descriptor failure.
    Trigger(TriggerError),
    /// Memory failure.
    Memory(MemoryError),
    /// No channel with this name.
    UnknownChannel {
        /// The name.
        id: ChannelId,
    },
    /// No arbiter with this name.
    UnknownArbiter {
        /// The name.
        id: ArbiterId,
    },
    /// No station with this name.
    UnknownStation {
        /// The name.
        id: StationId,
    },
    /// No memory with this name.
    UnknownMemory {
        /// The name.
        id: MemoryId,
    },
    /// A component with this name is already registered.
    Duplicate {
        /// Component kind (`"channel"`, `"arbiter"`, ...).
        kind: &'static str,
        /// The name.
        name: String,
    },
}

impl SimError {
    /// The error's classification.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(e) => e.class(),
            Self::Pool(e) => e.class(),
            Self::Channel(e) => e.class(),
            Self::Arbiter(e) => e.class(),
            Self::Semaphore(e) => e.class(),
            Self::Trigger(e) => e.class(),
            Self::Memory(e) => e.class(),
            Self::UnknownChannel { .. }
            | Self::UnknownArbiter { .. }
            | Self::UnknownStation { .. }
            | Self::UnknownMemory { .. } => ErrorClass::Lookup,
            Self::Duplicate { .. } => ErrorClass::Configuration,
        }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Pool(e) => write!(f, "pool: {e}"),
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Arbiter(e) => write!(f, "arbiter: {e}"),
            Self::Semaphore(e) => write!(f, "semaphore: {e}"),
            Self::Trigger(e) => write!(f, "trigger: {e}"),
            Self::Memory(e) => write!(f, "memory: {e}"),
            Self::UnknownChannel { id } => write!(f, "unknown channel '{id}'"),
            Self::UnknownArbiter { id } => write!(f, "unknown arbiter '{id}'"),
            Self::UnknownStation { id } => write!(f, "unknown station '{id}'"),
            Self::UnknownMemory { id } => write!(f, "unknown memory '{id}'"),
            Self::Duplicate { kind, name } => write!(f, "{kind} '{name}' is already registered"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Pool(e) => Some(e),
            Self::Channel(e) => Some(e),
            Self::Arbiter(e) => Some(e),
            Self::Semaphore(e) => Some(e),
            Self::Trigger(e) => Some(e),
            Self::Memory(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! sim_error_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SimError {
                fn from(e: $ty) -> Self {
                    Self::$variant(e)
                }
            }
        )*
    };
}

sim_error_from!(
    Config(ConfigError),
    Pool(PoolError),
    Channel(ChannelError),
    Arbiter(ArbiterError),
    Semaphore(SemaphoreError),
    Trigger(TriggerError),
    Memory(MemoryError),
);

// ── Records ────────────────────────────────────────────────────────

/// A semaphore grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    /// The station.
    pub station: StationId,
    /// Semaphore index.
    pub index: usize,
    /// The client granted.
    pub client: ClientId,
    /// Tick of the grant.
    pub tick: TickId,
}

/// What one [`Simulation::step`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// The tick processed. The clock is now one past it.
    pub tick: TickId,
    /// Messages dispatched.
    pub dispatched: usize,
    /// Buffers admitted onto channels.
    pub admitted: Vec<BufferId>,
    /// Buffers whose transfer released its channel.
    pub released: Vec<BufferId>,
    /// State changes applied from the recorded schedule.
    pub transitions: Vec<Transition>,
    /// Grants made while applying triggers.
    pub grants: Vec<Grant>,
}

// ── Simulation ─────────────────────────────────────────────────────

/// Owns the pool and every component, and steps them in lockstep.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    tick: TickId,
    pool: BufferPool,
    channels: IndexMap<ChannelId, Channel>,
    arbiters: IndexMap<ArbiterId, Arbiter>,
    stations: IndexMap<StationId, SemaphoreStation>,
    memories: IndexMap<MemoryId, Memory>,
    inbox: VecDeque<Message>,
    grants: Vec<Grant>,
    metrics: SimMetrics,
}

impl Simulation {
    /// Create an empty simulation at tick 0.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let pool = BufferPool::new(PoolConfig::with_seed(config.seed));
        Ok(Self {
            config,
            tick: TickId(0),
            pool,
            channels: IndexMap::new(),
            arbiters: IndexMap::new(),
            stations: IndexMap::new(),
            memories: IndexMap::new(),
            inbox: VecDeque::new(),
            grants: Vec::new(),
            metrics: SimMetrics::default(),
        })
    }

    // ── Topology ───────────────────────────────────────────────────

    /// Register a channel.
    pub fn add_channel(&mut self, channel: Channel) -> Result<(), SimError> {
        let id = channel.id().clone();
        if self.channels.contains_key(&id) {
            return Err(duplicate("channel", id.as_str()));
        }
        self.channels.insert(id, channel);
        Ok(())
    }

    /// Register a memory.
    pub fn add_memory(
        &mut self,
        id: impl Into<MemoryId>,
        config: MemoryConfig,
    ) -> Result<(), SimError> {
        let id = id.into();
        if self.memories.contains_key(&id) {
            return Err(duplicate("memory", id.as_str()));
        }
        self.memories.insert(id.clone(), Memory::new(id, config));
        Ok(())
    }

    /// Register a semaphore station.
    pub fn add_station(&mut self, station: SemaphoreStation) -> Result<(), SimError> {
        let id = station.id().clone();
        if self.stations.contains_key(&id) {
            return Err(duplicate("station", id.as_str()));
        }
        self.stations.insert(id, station);
        Ok(())
    }

    /// Register an arbiter. If it names a downstream channel, use
    /// [`attach`](Self::attach) instead of wiring it beforehand.
    pub fn add_arbiter(&mut self, arbiter: Arbiter) -> Result<(), SimError> {
        let id = arbiter.id().clone();
        if self.arbiters.contains_key(&id) {
            return Err(duplicate("arbiter", id.as_str()));
        }
        self.arbiters.insert(id, arbiter);
        Ok(())
    }

    /// Register `requester` as an upstream of `arbiter`.
    pub fn add_requester(
        &mut self,
        arbiter: &ArbiterId,
        requester: impl Into<RequesterId>,
    ) -> Result<(), SimError> {
        self.arbiter_mut(arbiter)?.add_requester(requester);
        Ok(())
    }

    /// Attach `channel` as the downstream of `arbiter`.
    ///
    /// Several arbiters may drive one channel only if they share a mode.
    pub fn attach(&mut self, arbiter: &ArbiterId, channel: &ChannelId) -> Result<(), SimError> {
        let mode = self.arbiter(arbiter)?.mode();
        let conflict = self
            .arbiters
            .values()
            .any(|a| a.id() != arbiter && a.downstream() == Some(channel) && a.mode() != mode);
        if conflict {
            return Err(ArbiterError::ModeConflict {
                arbiter: arbiter.clone(),
                channel: channel.clone(),
            }
            .into());
        }
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| SimError::UnknownChannel {
                id: channel.clone(),
            })?;
        let arb = self
            .arbiters
            .get_mut(arbiter)
            .ok_or_else(|| SimError::UnknownArbiter {
                id: arbiter.clone(),
            })?;
        arb.attach(ch)?;
        Ok(())
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The current tick: the next one [`step`](Self::step) will process.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// The shared buffer pool.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Every grant so far, in order.
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    /// A registered channel.
    pub fn channel(&self, id: &ChannelId) -> Result<&Channel, SimError> {
        self.channels
            .get(id)
            .ok_or_else(|| SimError::UnknownChannel { id: id.clone() })
    }

    /// A registered arbiter.
    pub fn arbiter(&self, id: &ArbiterId) -> Result<&Arbiter, SimError> {
        self.arbiters
            .get(id)
            .ok_or_else(|| SimError::UnknownArbiter { id: id.clone() })
    }

    /// A registered station.
    pub fn station(&self, id: &StationId) -> Result<&SemaphoreStation, SimError> {
        self.stations
            .get(id)
            .ok_or_else(|| SimError::UnknownStation { id: id.clone() })
    }

    /// A registered memory.
    pub fn memory(&self, id: &MemoryId) -> Result<&Memory, SimError> {
        self.memories
            .get(id)
            .ok_or_else(|| SimError::UnknownMemory { id: id.clone() })
    }

    /// Messages waiting for the next step.
    pub fn queued_messages(&self) -> usize {
        self.inbox.len()
    }

    /// Whether nothing is queued, pending, in flight or scheduled.
    pub fn is_quiescent(&self) -> bool {
        self.inbox.is_empty()
            && self.arbiters.values().all(Arbiter::is_idle)
            && self.channels.values().all(Channel::is_idle)
            && self.pool.pending_arrivals() == 0
            && !self.pool.has_fired()
    }

    // ── Direct operations ──────────────────────────────────────────
    //
    // These act at the current tick and apply any fired triggers
    // before returning.

    /// Create a buffer owned by `memory`.
    pub fn alloc(
        &mut self,
        memory: &MemoryId,
        size: u64,
        content: Option<Vec<u8>>,
    ) -> Result<BufferId, SimError> {
        self.pool.set_tick(self.tick);
        let mem = self
            .memories
            .get(memory)
            .ok_or_else(|| SimError::UnknownMemory { id: memory.clone() })?;
        let id = mem.alloc(&mut self.pool, size, content)?;
        self.metrics.buffers_allocated += 1;
        Ok(id)
    }

    /// Deallocate a buffer held by `memory`.
    pub fn dealloc(&mut self, memory: &MemoryId, buffer: BufferId) -> Result<(), SimError> {
        self.pool.set_tick(self.tick);
        let mem = self
            .memories
            .get(memory)
            .ok_or_else(|| SimError::UnknownMemory { id: memory.clone() })?;
        mem.dealloc(&mut self.pool, buffer)?;
        self.metrics.buffers_deallocated += 1;
        self.apply_fired()?;
        Ok(())
    }

    /// Hand a buffer held by `memory` to a compute resource.
    pub fn begin_use(&mut self, memory: &MemoryId, buffer: BufferId) -> Result<(), SimError> {
        self.pool.set_tick(self.tick);
        let mem = self
            .memories
            .get(memory)
            .ok_or_else(|| SimError::UnknownMemory { id: memory.clone() })?;
        mem.begin_use(&mut self.pool, buffer)?;
        self.apply_fired()?;
        Ok(())
    }

    /// Arm a trigger on `buffer`. The station must exist and the index
    /// must be in range.
    pub fn add_trigger(&mut self, buffer: BufferId, trigger: Trigger) -> Result<u64, SimError> {
        self.station(&trigger.station)?.check_index(trigger.index)?;
        Ok(self.pool.add_trigger(buffer, trigger)?)
    }

    /// Parse a JSON trigger descriptor and arm it on `buffer`.
    pub fn add_trigger_json(&mut self, buffer: BufferId, json: &str) -> Result<u64, SimError> {
        let trigger = TriggerDescriptor::parse(json)?;
        self.add_trigger(buffer, trigger)
    }

    /// Queue a transfer with `arbiter` at the current tick. It is
    /// admitted by the next [`step`](Self::step).
    pub fn request(
        &mut self,
        arbiter: &ArbiterId,
        requester: RequesterId,
        buffer: BufferId,
        destination: MemoryId,
    ) -> Result<(), SimError> {
        if !self.memories.contains_key(&destination) {
            return Err(SimError::UnknownMemory { id: destination });
        }
        let state = self.pool.state(buffer)?;
        match state {
            BufferState::Allocated => {}
            BufferState::Deallocated => {
                return Err(PoolError::AlreadyDeallocated { id: buffer }.into());
            }
            from => {
                return Err(PoolError::InvalidTransition {
                    id: buffer,
                    from,
                    to: BufferState::Transit,
                }
                .into());
            }
        }
        let tick = self.tick;
        self.arbiter_mut(arbiter)?
            .request(tick, requester, buffer, destination)?;
        self.metrics.requests += 1;
        Ok(())
    }

    /// Signal `station[index]` now.
    pub fn signal(&mut self, station: &StationId, index: usize) -> Result<SignalOutcome, SimError> {
        let tick = self.tick;
        let outcome = self.station_mut(station)?.signal(index)?;
        if let SignalOutcome::Granted(client) = &outcome {
            self.record_grant(station.clone(), index, client.clone(), tick);
        }
        Ok(outcome)
    }

    /// Wait on `station[index]` now.
    pub fn wait(
        &mut self,
        station: &StationId,
        index: usize,
        client: ClientId,
    ) -> Result<WaitOutcome, SimError> {
        let tick = self.tick;
        let outcome = self.station_mut(station)?.wait(client.clone(), index)?;
        if outcome == WaitOutcome::Granted {
            self.record_grant(station.clone(), index, client, tick);
        }
        Ok(outcome)
    }

    /// Queue a boundary message for the next step.
    pub fn post(&mut self, message: Message) {
        trace!(kind = message.kind(), "message posted");
        self.inbox.push_back(message);
    }

    // ── Stepping ───────────────────────────────────────────────────

    /// Process the current tick and advance the clock by one.
    ///
    /// A failing message aborts the step before the clock moves;
    /// messages after it stay queued. The step is not rolled back: the
    /// messages dispatched before the failure, and their triggers, have
    /// already taken effect. The same holds when admission fails after
    /// dispatch.
    pub fn step(&mut self) -> Result<StepReport, SimError> {
        let now = self.tick;
        self.pool.set_tick(now);
        let mut report = StepReport {
            tick: now,
            ..StepReport::default()
        };

        while let Some(message) = self.inbox.pop_front() {
            self.dispatch(message)?;
            report.dispatched += 1;
            let grants = self.apply_fired()?;
            report.grants.extend(grants);
        }
        self.metrics.messages_dispatched += report.dispatched as u64;

        for arbiter in self.arbiters.values_mut() {
            let Some(channel_id) = arbiter.downstream() else {
                continue;
            };
            let channel = self
                .channels
                .get_mut(channel_id)
                .ok_or_else(|| SimError::UnknownChannel {
                    id: channel_id.clone(),
                })?;
            let admitted = arbiter.admit(now, channel, &mut self.pool)?;
            self.metrics.transfers_admitted += admitted.len() as u64;
            report.admitted.extend(admitted);
        }

        for channel in self.channels.values_mut() {
            for done in channel.advance(now) {
                if let Some(owner) = self.arbiters.values_mut().find_map(|a| a.complete(&done)) {
                    trace!(buffer = %done.buffer, requester = %owner.requester, "released");
                }
                self.metrics.transfers_completed += 1;
                self.metrics.bytes_transferred += done.size;
                report.released.push(done.buffer);
            }
            for e in channel.expectations() {
                if self.pool.state(e.buffer)? != BufferState::Transit {
                    continue;
                }
                let Some(destination) = self.pool.get(e.buffer)?.destination().cloned() else {
                    continue;
                };
                self.pool.record_expected(
                    e.buffer,
                    Expected {
                        destination,
                        arrive_at: e.arrive_at,
                        respond_at: e.respond_at,
                    },
                )?;
            }
        }

        self.tick = now.next();
        report.transitions = self.pool.resolve_due(self.tick)?;
        for t in &report.transitions {
            if t.from < BufferState::Arrived && t.to >= BufferState::Arrived {
                self.metrics.arrivals += 1;
            }
            if t.to == BufferState::Responded {
                self.metrics.responses += 1;
            }
        }

        let grants = self.apply_fired()?;
        report.grants.extend(grants);
        self.metrics.ticks += 1;
        debug!(
            tick = %now,
            dispatched = report.dispatched,
            admitted = report.admitted.len(),
            released = report.released.len(),
            transitions = report.transitions.len(),
            grants = report.grants.len(),
            "step"
        );
        Ok(report)
    }

    /// Step `ticks` times. Returns the number of steps taken.
    pub fn run(&mut self, ticks: u64) -> Result<u64, SimError> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(ticks)
    }

    /// Step for the configured `default_run_ticks`.
    pub fn run_default(&mut self) -> Result<u64, SimError> {
        self.run(self.config.default_run_ticks)
    }

    /// Step until [`is_quiescent`](Self::is_quiescent) or `max_ticks`
    /// steps, whichever comes first. Returns the steps taken.
    pub fn run_until_quiescent(&mut self, max_ticks: u64) -> Result<u64, SimError> {
        let mut taken = 0;
        while taken < max_ticks && !self.is_quiescent() {
            self.step()?;
            taken += 1;
        }
        Ok(taken)
    }

    // ── Internals ──────────────────────────────────────────────────

    fn dispatch(&mut self, message: Message) -> Result<(), SimError> {
        trace!(kind = message.kind(), tick = %self.tick, "dispatch");
        match message {
            Message::BufferTransfer {
                buffer,
                requester,
                arbiter,
                destination,
            } => {
                let held = self.pool.get(buffer.id)?;
                let field = if held.size() != buffer.size {
                    Some("size")
                } else if buffer.content.as_deref().is_some_and(|c| c != held.content()) {
                    Some("content")
                } else {
                    None
                };
                if let Some(field) = field {
                    return Err(PoolError::DescriptorMismatch {
                        id: buffer.id,
                        field,
                    }
                    .into());
                }
                self.request(&arbiter, requester, buffer.id, destination)
            }
            Message::BufferConsume { buffer_id } => {
                self.pool.consume(buffer_id)?;
                self.metrics.buffers_deallocated += 1;
                Ok(())
            }
            Message::SemWait {
                station,
                index,
                client,
            } => self.wait(&station, index, client).map(|_| ()),
            Message::SemSignal { station, index } => self.signal(&station, index).map(|_| ()),
        }
    }

    /// Apply queued fired triggers to their stations.
    fn apply_fired(&mut self) -> Result<Vec<Grant>, SimError> {
        let fired = self.pool.take_fired();
        let mut grants = Vec::new();
        for FiredTrigger {
            buffer,
            trigger,
            tick,
            ..
        } in fired
        {
            self.metrics.triggers_fired += 1;
            let station = self.station_mut(&trigger.station)?;
            let granted = match trigger.action {
                TriggerAction::Signal => match station.signal(trigger.index)? {
                    SignalOutcome::Granted(client) => Some(client),
                    SignalOutcome::Incremented { .. } => None,
                },
                TriggerAction::Wait => {
                    let client = ClientId::from(buffer);
                    match station.wait(client.clone(), trigger.index)? {
                        WaitOutcome::Granted => Some(client),
                        WaitOutcome::Queued { .. } => None,
                    }
                }
            };
            debug!(
                buffer = %buffer,
                on = %trigger.on,
                action = %trigger.action,
                station = %trigger.station,
                index = trigger.index,
                "trigger fired"
            );
            if let Some(client) = granted {
                grants.push(self.record_grant(trigger.station, trigger.index, client, tick));
            }
        }
        Ok(grants)
    }

    fn record_grant(
        &mut self,
        station: StationId,
        index: usize,
        client: ClientId,
        tick: TickId,
    ) -> Grant {
        debug!(station = %station, index, client = %client, tick = %tick, "grant");
        let grant = Grant {
            station,
            index,
            client,
            tick,
        };
        self.grants.push(grant.clone());
        self.metrics.grants += 1;
        grant
    }

    fn arbiter_mut(&mut self, id: &ArbiterId) -> Result<&mut Arbiter, SimError> {
        self.arbiters
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownArbiter { id: id.clone() })
    }

    fn station_mut(&mut self, id: &StationId) -> Result<&mut SemaphoreStation, SimError> {
        self.stations
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownStation { id: id.clone() })
    }
}

fn duplicate(kind: &'static str, name: &str) -> SimError {
    SimError::Duplicate {
        kind,
        name: name.to_string(),
    }
}
