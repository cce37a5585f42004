//! Core types for the archsim contention engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other archsim crate: the simulation
//! clock, buffer and component identifiers, the buffer lifecycle
//! states, per-subsystem error types, and the message types that cross
//! the boundary between the core and the resources around it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod message;
pub mod state;

pub use error::{
    ArbiterError, ChannelError, ErrorClass, PoolError, SemaphoreError, TriggerError,
};
pub use id::{ArbiterId, BufferId, ChannelId, ClientId, MemoryId, RequesterId, StationId, TickId};
pub use message::{BufferDescriptor, Message};
pub use state::BufferState;
