//! Counting semaphore stations for archsim.
//!
//! A [`SemaphoreStation`] is a fixed bank of counting semaphores, each
//! with a FIFO queue of waiting clients. Waiting never blocks anything:
//! a queued client simply stays in the queue until a later `signal`
//! grants it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod station;

pub use station::{SemaphoreStation, SignalOutcome, StationConfig, WaitOutcome};
