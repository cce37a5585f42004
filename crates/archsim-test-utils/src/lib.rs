//! Test fixtures for archsim development.
//!
//! [`Rig`] builds the standard two-requester topology used across the
//! integration tests and benches:
//!
//! ```text
//!  pe0 ─┐
//!       ├─ arb ──▶ bus ──▶ sram
//!  pe1 ─┘            (buffers start in dram)
//! ```
//!
//! plus a 32-semaphore station named `sem`.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{grant_log, state_timeline, BusKind, Rig};
