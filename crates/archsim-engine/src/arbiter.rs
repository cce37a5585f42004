//! Merging upstream requesters onto one downstream channel.
//!
//! An [`Arbiter`] collects transfer requests during a tick and admits
//! them onto its channel when the stepper calls [`Arbiter::admit`].
//! Admission order is deterministic: arrival tick, then requester id,
//! then submission order.
//!
//! - [`ArbiterMode::Shared`] drives the channel in interleaving mode;
//!   every admitted transfer competes for bandwidth at once.
//! - [`ArbiterMode::Scheduled`] drives it in blocking mode; admitted
//!   transfers queue on the channel and run one at a time.

use std::fmt;
use std::str::FromStr;

use archsim_channel::{Channel, CompletedTransfer, TransferMode, TransferRequest};
use archsim_core::{
    ArbiterError, ArbiterId, BufferId, ChannelError, ChannelId, MemoryId, RequesterId, TickId,
};
use archsim_pool::{BufferPool, Expected};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Arbitration policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArbiterMode {
    /// All pending requests share the channel's bandwidth.
    #[default]
    Shared,
    /// One request at a time at full bandwidth, FIFO.
    Scheduled,
}

impl ArbiterMode {
    /// The channel transfer mode this policy requires.
    pub fn transfer_mode(self) -> TransferMode {
        match self {
            Self::Shared => TransferMode::Interleaving,
            Self::Scheduled => TransferMode::Blocking,
        }
    }
}

impl fmt::Display for ArbiterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl FromStr for ArbiterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(Self::Shared),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(format!(
                "unknown arbiter mode '{other}' (expected shared or scheduled)"
            )),
        }
    }
}

/// A request waiting for admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    /// Who asked.
    pub requester: RequesterId,
    /// The buffer to move.
    pub buffer: BufferId,
    /// Where it goes.
    pub destination: MemoryId,
    /// Tick the request reached the arbiter.
    pub arrived_at: TickId,
    /// Submission order within the arbiter.
    pub seq: u64,
}

/// A request admitted onto the channel and not yet released.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveRequest {
    /// Who asked.
    pub requester: RequesterId,
    /// Where the buffer goes.
    pub destination: MemoryId,
    /// Tick the request reached the arbiter.
    pub arrived_at: TickId,
    /// Tick it was admitted onto the channel.
    pub admitted_at: TickId,
}

/// Cumulative arbiter accounting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArbiterStats {
    /// Requests accepted.
    pub requests: u64,
    /// Requests admitted onto the channel.
    pub admitted: u64,
    /// Admitted requests whose transfer released the channel.
    pub completed: u64,
    /// Sum over completed requests of ticks from arrival to release.
    pub total_latency_ticks: u64,
}

/// Merges N upstream requesters onto one downstream channel.
#[derive(Clone, Debug)]
pub struct Arbiter {
    id: ArbiterId,
    mode: ArbiterMode,
    upstream: IndexSet<RequesterId>,
    downstream: Option<ChannelId>,
    pending: Vec<PendingRequest>,
    active: IndexMap<BufferId, ActiveRequest>,
    next_seq: u64,
    stats: ArbiterStats,
}

impl Arbiter {
    /// Create an arbiter with no requesters and no downstream channel.
    pub fn new(id: impl Into<ArbiterId>, mode: ArbiterMode) -> Self {
        Self {
            id: id.into(),
            mode,
            upstream: IndexSet::new(),
            downstream: None,
            pending: Vec::new(),
            active: IndexMap::new(),
            next_seq: 0,
            stats: ArbiterStats::default(),
        }
    }

    /// The arbiter's name.
    pub fn id(&self) -> &ArbiterId {
        &self.id
    }

    /// Arbitration policy.
    pub fn mode(&self) -> ArbiterMode {
        self.mode
    }

    /// The attached channel, if any.
    pub fn downstream(&self) -> Option<&ChannelId> {
        self.downstream.as_ref()
    }

    /// Registered requesters.
    pub fn upstream(&self) -> impl Iterator<Item = &RequesterId> {
        self.upstream.iter()
    }

    /// Cumulative accounting.
    pub fn stats(&self) -> &ArbiterStats {
        &self.stats
    }

    /// Requests waiting for admission.
    pub fn pending(&self) -> &[PendingRequest] {
        &self.pending
    }

    /// Admitted requests still on the channel, in admission order.
    pub fn active(&self) -> impl Iterator<Item = (&BufferId, &ActiveRequest)> {
        self.active.iter()
    }

    /// Whether nothing is pending or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    /// Register an upstream requester. Returns `false` if it already was.
    pub fn add_requester(&mut self, requester: impl Into<RequesterId>) -> bool {
        self.upstream.insert(requester.into())
    }

    /// Attach `channel` as the downstream and put it in this policy's
    /// transfer mode.
    pub fn attach(&mut self, channel: &mut Channel) -> Result<(), ArbiterError> {
        channel.set_transfer_mode(self.mode.transfer_mode())?;
        debug!(arbiter = %self.id, channel = %channel.id(), mode = %self.mode, "attached");
        self.downstream = Some(channel.id().clone());
        Ok(())
    }

    /// Queue a transfer of `buffer` to `destination` on behalf of
    /// `requester`, arriving at tick `now`.
    pub fn request(
        &mut self,
        now: TickId,
        requester: RequesterId,
        buffer: BufferId,
        destination: MemoryId,
    ) -> Result<(), ArbiterError> {
        let Some(channel) = &self.downstream else {
            return Err(ArbiterError::NoDownstream {
                arbiter: self.id.clone(),
            });
        };
        if !self.upstream.contains(&requester) {
            return Err(ArbiterError::UnknownRequester {
                arbiter: self.id.clone(),
                requester,
            });
        }
        if self.active.contains_key(&buffer) || self.pending.iter().any(|p| p.buffer == buffer) {
            return Err(ChannelError::DuplicateTransfer {
                channel: channel.clone(),
                buffer,
            }
            .into());
        }
        debug!(arbiter = %self.id, requester = %requester, buffer = %buffer, tick = %now, "request");
        self.pending.push(PendingRequest {
            requester,
            buffer,
            destination,
            arrived_at: now,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.stats.requests += 1;
        Ok(())
    }

    /// Admit every pending request onto `channel` at tick `now`.
    ///
    /// Each admission moves the buffer into `transit`, offers it to the
    /// channel, and records the channel's expectation in the pool.
    /// Returns the admitted buffers in admission order. On error the
    /// failing request is dropped and the rest stay pending.
    pub fn admit(
        &mut self,
        now: TickId,
        channel: &mut Channel,
        pool: &mut BufferPool,
    ) -> Result<Vec<BufferId>, ArbiterError> {
        if self.downstream.as_ref() != Some(channel.id()) {
            return Err(ArbiterError::NoDownstream {
                arbiter: self.id.clone(),
            });
        }
        let mut queue = std::mem::take(&mut self.pending);
        queue.sort_by(|a, b| {
            (a.arrived_at, &a.requester, a.seq).cmp(&(b.arrived_at, &b.requester, b.seq))
        });

        let mut admitted = Vec::with_capacity(queue.len());
        let mut queue = queue.into_iter();
        while let Some(req) = queue.next() {
            if let Err(e) = Self::admit_one(now, &req, channel, pool) {
                self.pending.extend(queue);
                return Err(e);
            }
            debug!(
                arbiter = %self.id,
                requester = %req.requester,
                buffer = %req.buffer,
                tick = %now,
                "admitted"
            );
            admitted.push(req.buffer);
            self.active.insert(
                req.buffer,
                ActiveRequest {
                    requester: req.requester,
                    destination: req.destination,
                    arrived_at: req.arrived_at,
                    admitted_at: now,
                },
            );
            self.stats.admitted += 1;
        }
        Ok(admitted)
    }

    fn admit_one(
        now: TickId,
        req: &PendingRequest,
        channel: &mut Channel,
        pool: &mut BufferPool,
    ) -> Result<(), ArbiterError> {
        let size = pool.get(req.buffer)?.size();
        pool.begin_transit(req.buffer, req.destination.clone())?;
        let expectation = channel.begin_transfer(
            now,
            TransferRequest {
                requester: req.requester.clone(),
                buffer: req.buffer,
                size,
            },
        )?;
        pool.record_expected(
            req.buffer,
            Expected {
                destination: req.destination.clone(),
                arrive_at: expectation.arrive_at,
                respond_at: expectation.respond_at,
            },
        )?;
        Ok(())
    }

    /// Release a transfer the channel reported complete. Returns the
    /// request if this arbiter admitted it.
    pub fn complete(&mut self, done: &CompletedTransfer) -> Option<ActiveRequest> {
        let request = self.active.shift_remove(&done.buffer)?;
        self.stats.completed += 1;
        self.stats.total_latency_ticks += done.released_at.since(request.arrived_at);
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archsim_channel::ChannelConfig;
    use archsim_core::{BufferState, ErrorClass};

    fn channel() -> Channel {
        Channel::new(
            "bus",
            ChannelConfig {
                bandwidth: 128,
                latency: 0,
                ..ChannelConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn request_without_downstream_is_configuration_error() {
        let mut arb = Arbiter::new("arb", ArbiterMode::Shared);
        arb.add_requester("r0");
        let err = arb
            .request(TickId(0), "r0".into(), BufferId(0), "m".into())
            .unwrap_err();
        assert_eq!(
            err,
            ArbiterError::NoDownstream {
                arbiter: "arb".into()
            }
        );
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(arb.is_idle());
    }

    #[test]
    fn unknown_requester_rejected() {
        let mut ch = channel();
        let mut arb = Arbiter::new("arb", ArbiterMode::Shared);
        arb.attach(&mut ch).unwrap();
        let err = arb
            .request(TickId(0), "stranger".into(), BufferId(0), "m".into())
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Lookup);
    }

    #[test]
    fn attach_sets_channel_mode() {
        let mut ch = channel();
        let mut arb = Arbiter::new("arb", ArbiterMode::Scheduled);
        arb.attach(&mut ch).unwrap();
        assert_eq!(ch.transfer_mode(), TransferMode::Blocking);
        assert_eq!(arb.downstream(), Some(&ChannelId::from("bus")));
    }

    #[test]
    fn admit_records_expected_arrival() {
        let mut pool = BufferPool::default();
        let mut ch = channel();
        let mut arb = Arbiter::new("arb", ArbiterMode::Shared);
        arb.add_requester("r0");
        arb.add_requester("r1");
        arb.attach(&mut ch).unwrap();

        let a = pool.create(256, None, Some("src".into())).unwrap();
        let b = pool.create(256, None, Some("src".into())).unwrap();
        arb.request(TickId(0), "r1".into(), b, "dst".into()).unwrap();
        arb.request(TickId(0), "r0".into(), a, "dst".into()).unwrap();

        let admitted = arb.admit(TickId(0), &mut ch, &mut pool).unwrap();
        // Same arrival tick: lexicographic requester order.
        assert_eq!(admitted, [a, b]);
        assert_eq!(pool.state(a).unwrap(), BufferState::Transit);
        // The first admission alone expected tick 2; re-reading the
        // channel gives the shared prediction.
        assert_eq!(pool.expected_arrival(a), Some(TickId(2)));
        assert_eq!(pool.expected_arrival(b), Some(TickId(4)));
        assert_eq!(ch.expectation(a).unwrap().arrive_at, TickId(4));
        assert_eq!(arb.stats().admitted, 2);
    }

    #[test]
    fn duplicate_request_rejected() {
        let mut ch = channel();
        let mut arb = Arbiter::new("arb", ArbiterMode::Shared);
        arb.add_requester("r0");
        arb.attach(&mut ch).unwrap();
        arb.request(TickId(0), "r0".into(), BufferId(1), "m".into())
            .unwrap();
        let err = arb
            .request(TickId(0), "r0".into(), BufferId(1), "m".into())
            .unwrap_err();
        assert!(matches!(
            err,
            ArbiterError::Channel(ChannelError::DuplicateTransfer { .. })
        ));
    }

    #[test]
    fn failed_admission_keeps_remaining_requests() {
        let mut pool = BufferPool::default();
        let mut ch = channel();
        let mut arb = Arbiter::new("arb", ArbiterMode::Scheduled);
        arb.add_requester("r0");
        arb.attach(&mut ch).unwrap();
        let good = pool.create(8, None, Some("src".into())).unwrap();
        arb.request(TickId(0), "r0".into(), BufferId(99), "dst".into())
            .unwrap();
        arb.request(TickId(0), "r0".into(), good, "dst".into())
            .unwrap();
        let err = arb.admit(TickId(0), &mut ch, &mut pool).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Lookup);
        assert_eq!(arb.pending().len(), 1);
        assert_eq!(arb.admit(TickId(0), &mut ch, &mut pool).unwrap(), [good]);
    }

    #[test]
    fn mode_parses() {
        assert_eq!("shared".parse::<ArbiterMode>(), Ok(ArbiterMode::Shared));
        assert_eq!(
            "scheduled".parse::<ArbiterMode>(),
            Ok(ArbiterMode::Scheduled)
        );
        assert!("round-robin".parse::<ArbiterMode>().is_err());
    }
}
