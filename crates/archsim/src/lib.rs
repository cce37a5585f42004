//! archsim: discrete-tick contention and buffer lifecycle simulation.
//!
//! This is the facade crate that re-exports the public API from all
//! archsim sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use archsim::prelude::*;
//!
//! let mut sim = Simulation::new(SimConfig::default()).unwrap();
//! sim.add_memory("dram", MemoryConfig::default()).unwrap();
//! sim.add_memory("sram", MemoryConfig::default()).unwrap();
//! sim.add_station(SemaphoreStation::new("sem", StationConfig::default()).unwrap()).unwrap();
//! sim.add_channel(Channel::read_bus("rd", ReadBusConfig::default()).unwrap()).unwrap();
//! sim.add_arbiter(Arbiter::new("arb", ArbiterMode::Scheduled)).unwrap();
//! for pe in ["pe0", "pe1"] {
//!     sim.add_requester(&"arb".into(), pe).unwrap();
//! }
//! sim.attach(&"arb".into(), &"rd".into()).unwrap();
//!
//! let a = sim.alloc(&"dram".into(), 256, None).unwrap();
//! let b = sim.alloc(&"dram".into(), 256, None).unwrap();
//! sim.add_trigger(b, Trigger::signal(BufferState::Arrived, "sem", 0)).unwrap();
//! sim.wait(&"sem".into(), 0, "compute".into()).unwrap();
//! sim.request(&"arb".into(), "pe0".into(), a, "sram".into()).unwrap();
//! sim.request(&"arb".into(), "pe1".into(), b, "sram".into()).unwrap();
//! sim.run_until_quiescent(100).unwrap();
//!
//! // Scheduled: the second read starts when the first finishes.
//! assert_eq!(sim.grants()[0].tick, TickId(24));
//! assert_eq!(sim.pool().total_allocated_bytes(&"sram".into()), 512);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `archsim-core` | Ids, lifecycle states, errors, messages |
//! | [`channel`] | `archsim-channel` | Channel, read bus, write bus timing |
//! | [`pool`] | `archsim-pool` | Buffer registry, lifecycle, triggers |
//! | [`semaphore`] | `archsim-semaphore` | Semaphore stations |
//! | [`engine`] | `archsim-engine` | Arbiters, memories, the stepper |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Identifiers, lifecycle states, errors and boundary messages (`archsim-core`).
pub use archsim_core as types;

/// Channel timing (`archsim-channel`).
///
/// [`channel::Channel`] models plain channels, read buses and write
/// buses in interleaving or blocking mode.
pub use archsim_channel as channel;

/// The buffer registry (`archsim-pool`).
pub use archsim_pool as pool;

/// Counting semaphore stations (`archsim-semaphore`).
pub use archsim_semaphore as semaphore;

/// Arbitration and the tick stepper (`archsim-engine`).
pub use archsim_engine as engine;

/// Common imports for typical archsim usage.
pub mod prelude {
    // Core types
    pub use archsim_core::{
        ArbiterId, BufferDescriptor, BufferId, BufferState, ChannelId, ClientId, ErrorClass,
        MemoryId, Message, RequesterId, StationId, TickId,
    };

    // Channels
    pub use archsim_channel::{
        Channel, ChannelConfig, ReadBusConfig, TransferMode, WriteBusConfig,
    };

    // Pool
    pub use archsim_pool::{BufferPool, DataBuffer, Trigger, TriggerAction, TriggerDescriptor};

    // Semaphores
    pub use archsim_semaphore::{SemaphoreStation, SignalOutcome, StationConfig, WaitOutcome};

    // Engine
    pub use archsim_engine::{
        Arbiter, ArbiterMode, Grant, MemoryConfig, SimConfig, SimError, SimMetrics, Simulation,
    };
}
