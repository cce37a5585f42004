//! Buffer registry and lifecycle for archsim.
//!
//! [`BufferPool`] is the single source of truth for every
//! [`DataBuffer`]: who owns it, which lifecycle state it is in, and
//! which triggers are still armed on it. Components never hold buffers
//! themselves; they hold [`BufferId`](archsim_core::BufferId)s and go
//! through the pool for every state change.
//!
//! # Lifecycle
//!
//! ```text
//! Allocated → Transit → Arrived → Responded → InUse → Deallocated
//!     │                    │          │          │
//!     └────────────────────┴──────────┴──────────┴──── consume ──┘
//! ```
//!
//! Forward transitions walk through every intermediate state and fire
//! the triggers armed on each. `consume` is the only jump; it is
//! refused while the buffer is in transit.
//!
//! # Triggers
//!
//! A [`Trigger`] fires exactly once, when its buffer enters the
//! trigger's state. Fired triggers queue in the pool until the owner
//! drains them with [`BufferPool::take_fired`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod config;
mod content;
pub mod pool;
pub mod trigger;

pub use buffer::DataBuffer;
pub use config::PoolConfig;
pub use pool::{BufferPool, Expected, Transition};
pub use trigger::{FiredTrigger, Trigger, TriggerAction, TriggerDescriptor};
