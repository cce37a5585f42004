//! Arbitration and the tick stepper for archsim.
//!
//! This crate wires the leaf crates together. An [`Arbiter`] merges
//! upstream requesters onto one [`Channel`](archsim_channel::Channel);
//! the channel's timing model decides when each buffer lands; the
//! [`BufferPool`](archsim_pool::BufferPool) applies the arrival and
//! fires triggers; triggers drive
//! [`SemaphoreStation`](archsim_semaphore::SemaphoreStation)s.
//!
//! [`Simulation`] owns all of it and advances one tick per
//! [`step`](Simulation::step). Everything runs on the caller's thread
//! and the same inputs always produce the same run.
//!
//! # Example
//!
//! ```
//! use archsim_channel::{Channel, ReadBusConfig};
//! use archsim_core::{BufferState, TickId};
//! use archsim_engine::{Arbiter, ArbiterMode, MemoryConfig, SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default()).unwrap();
//! sim.add_memory("dram", MemoryConfig::default()).unwrap();
//! sim.add_memory("sram", MemoryConfig::default()).unwrap();
//! sim.add_channel(Channel::read_bus("rd", ReadBusConfig::default()).unwrap()).unwrap();
//! sim.add_arbiter(Arbiter::new("arb", ArbiterMode::Shared)).unwrap();
//! sim.add_requester(&"arb".into(), "pe0").unwrap();
//! sim.attach(&"arb".into(), &"rd".into()).unwrap();
//!
//! let buf = sim.alloc(&"dram".into(), 256, None).unwrap();
//! sim.request(&"arb".into(), "pe0".into(), buf, "sram".into()).unwrap();
//! sim.run_until_quiescent(100).unwrap();
//!
//! // 5 request + 2 data + 5 response ticks.
//! let landed = sim.pool().get(buf).unwrap();
//! assert_eq!(landed.state(), BufferState::Responded);
//! assert_eq!(landed.entered_at(BufferState::Arrived), Some(TickId(12)));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arbiter;
pub mod config;
pub mod memory;
pub mod metrics;
pub mod sim;

pub use arbiter::{ActiveRequest, Arbiter, ArbiterMode, ArbiterStats, PendingRequest};
pub use config::{ConfigError, SimConfig};
pub use memory::{Memory, MemoryConfig, MemoryError};
pub use metrics::SimMetrics;
pub use sim::{Grant, SimError, Simulation, StepReport};
