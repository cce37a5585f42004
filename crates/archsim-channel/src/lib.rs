//! Timing model for archsim channels.
//!
//! A [`Channel`] is one directed timing resource: a bandwidth in bytes
//! per tick, a latency in ticks, and a [`TransferMode`] deciding how
//! concurrent transfers share it.
//!
//! - **Interleaving:** every transfer in its data phase gets an equal
//!   share of the bandwidth. Joining or leaving changes everyone's
//!   expected completion; callers re-read [`Channel::expectations`]
//!   after every change instead of caching.
//! - **Blocking:** one transfer at a time at full bandwidth, FIFO.
//!   Expected completions are fixed when the transfer is queued.
//!
//! Read and write buses are channels whose [`ChannelKind`] splits a
//! transfer into a request leg, a bandwidth-limited data leg, and a
//! response leg:
//!
//! ```text
//!            lead              data                 tail        ack
//! Plain   │ 0          │ ceil(size/bw) │ latency               │ -
//! Read    │ req_lat    │ ceil(size/bw) │ data_response_latency │ (with arrival)
//! Write   │ req_lat    │ ceil(size/bw) │ 0                     │ write_response_latency
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod config;
mod share;

pub use channel::{
    Channel, ChannelKind, ChannelStats, CompletedTransfer, Expectation, Phases, TransferRequest,
};
pub use config::{ChannelConfig, ReadBusConfig, TransferMode, WriteBusConfig};
