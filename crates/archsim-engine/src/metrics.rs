//! Cumulative counters for a simulation run.
//!
//! Per-channel occupancy lives in
//! [`ChannelStats`](archsim_channel::ChannelStats); these are the
//! engine-wide totals.

/// Counters accumulated across every [`step`](crate::Simulation::step).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimMetrics {
    /// Ticks completed.
    pub ticks: u64,
    /// Boundary messages dispatched.
    pub messages_dispatched: u64,
    /// Transfer requests accepted by arbiters.
    pub requests: u64,
    /// Transfers admitted onto a channel.
    pub transfers_admitted: u64,
    /// Transfers that released their channel.
    pub transfers_completed: u64,
    /// Bytes carried by completed transfers.
    pub bytes_transferred: u64,
    /// Buffers that reached `arrived`.
    pub arrivals: u64,
    /// Buffers that reached `responded`.
    pub responses: u64,
    /// Buffers created.
    pub buffers_allocated: u64,
    /// Buffers deallocated.
    pub buffers_deallocated: u64,
    /// Triggers applied to stations.
    pub triggers_fired: u64,
    /// Semaphore grants.
    pub grants: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = SimMetrics::default();
        assert_eq!(m.ticks, 0);
        assert_eq!(m.transfers_admitted, 0);
        assert_eq!(m.bytes_transferred, 0);
        assert_eq!(m.grants, 0);
    }
}
