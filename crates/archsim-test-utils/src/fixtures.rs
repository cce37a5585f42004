//! Pre-wired simulations.

use archsim_channel::{Channel, ChannelConfig, ReadBusConfig, WriteBusConfig};
use archsim_core::{ArbiterId, BufferId, BufferState, MemoryId, RequesterId, StationId};
use archsim_engine::{Arbiter, ArbiterMode, MemoryConfig, SimConfig, Simulation};
use archsim_pool::BufferPool;
use archsim_semaphore::{SemaphoreStation, StationConfig};

pub const ARBITER: &str = "arb";
pub const BUS: &str = "bus";
pub const SOURCE: &str = "dram";
pub const DESTINATION: &str = "sram";
pub const STATION: &str = "sem";
pub const REQUESTERS: [&str; 2] = ["pe0", "pe1"];

/// Which channel kind the rig's bus is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusKind {
    /// Plain channel with the given latency.
    Plain { latency: u64 },
    /// Read bus with default latencies.
    Read,
    /// Write bus with default latencies.
    Write,
}

/// A simulation with the standard two-requester topology.
pub struct Rig {
    pub sim: Simulation,
}

impl Rig {
    /// Build the rig with a bus of `bandwidth` bytes per tick.
    pub fn new(mode: ArbiterMode, kind: BusKind, bandwidth: u64) -> Self {
        Self::with_config(SimConfig::default(), mode, kind, bandwidth)
    }

    pub fn with_config(config: SimConfig, mode: ArbiterMode, kind: BusKind, bandwidth: u64) -> Self {
        let channel = match kind {
            BusKind::Plain { latency } => Channel::new(
                BUS,
                ChannelConfig {
                    bandwidth,
                    latency,
                    ..ChannelConfig::default()
                },
            ),
            BusKind::Read => Channel::read_bus(
                BUS,
                ReadBusConfig {
                    data_response_bandwidth: bandwidth,
                    ..ReadBusConfig::default()
                },
            ),
            BusKind::Write => Channel::write_bus(
                BUS,
                WriteBusConfig {
                    write_bandwidth: bandwidth,
                    ..WriteBusConfig::default()
                },
            ),
        }
        .expect("rig bus config is valid");

        let mut sim = Simulation::new(config).expect("rig sim config is valid");
        sim.add_memory(SOURCE, MemoryConfig::default()).unwrap();
        sim.add_memory(DESTINATION, MemoryConfig::default()).unwrap();
        sim.add_station(SemaphoreStation::new(STATION, StationConfig::default()).unwrap())
            .unwrap();
        sim.add_channel(channel).unwrap();
        sim.add_arbiter(Arbiter::new(ARBITER, mode)).unwrap();
        for r in REQUESTERS {
            sim.add_requester(&ARBITER.into(), r).unwrap();
        }
        sim.attach(&ARBITER.into(), &BUS.into()).unwrap();
        Self { sim }
    }

    pub fn arbiter() -> ArbiterId {
        ARBITER.into()
    }

    pub fn station() -> StationId {
        STATION.into()
    }

    pub fn source() -> MemoryId {
        SOURCE.into()
    }

    pub fn destination() -> MemoryId {
        DESTINATION.into()
    }

    pub fn requester(i: usize) -> RequesterId {
        REQUESTERS[i].into()
    }

    /// Allocate a buffer in the source memory.
    pub fn alloc(&mut self, size: u64) -> BufferId {
        self.sim.alloc(&Self::source(), size, None).unwrap()
    }

    /// Allocate a buffer and queue its transfer from requester `i`.
    pub fn request(&mut self, i: usize, size: u64) -> BufferId {
        let id = self.alloc(size);
        self.sim
            .request(&Self::arbiter(), Self::requester(i), id, Self::destination())
            .unwrap();
        id
    }

    /// Tick at which `buffer` entered `state`.
    pub fn entered(&self, buffer: BufferId, state: BufferState) -> Option<u64> {
        self.sim
            .pool()
            .get(buffer)
            .ok()
            .and_then(|b| b.entered_at(state))
            .map(|t| t.0)
    }

    /// Run until quiescent, panicking if that takes over `max` ticks.
    pub fn settle(&mut self, max: u64) -> u64 {
        let taken = self.sim.run_until_quiescent(max).unwrap();
        assert!(self.sim.is_quiescent(), "rig did not settle in {max} ticks");
        taken
    }
}

/// `(client, tick)` for every grant on `station`, in order.
pub fn grant_log(sim: &Simulation, station: &str) -> Vec<(String, u64)> {
    sim.grants()
        .iter()
        .filter(|g| g.station.as_str() == station)
        .map(|g| (g.client.as_str().to_string(), g.tick.0))
        .collect()
}

/// `(state, tick)` for every state `buffer` has entered.
pub fn state_timeline(pool: &BufferPool, buffer: BufferId) -> Vec<(BufferState, u64)> {
    pool.get(buffer)
        .map(|b| b.history().iter().map(|(s, t)| (*s, t.0)).collect())
        .unwrap_or_default()
}
