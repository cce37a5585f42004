//! Benchmark profiles for the archsim contention engine.
//!
//! - [`contention_profile`]: N requesters behind one arbiter, each with
//!   one queued transfer, ready to step.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use archsim_channel::{Channel, ChannelConfig};
use archsim_core::{ArbiterId, MemoryId, RequesterId};
use archsim_engine::{Arbiter, ArbiterMode, MemoryConfig, SimConfig, SimError, Simulation};

/// Build a simulation with `requesters` upstream of one arbiter on a
/// 128 B/tick channel, each with one `size`-byte transfer queued.
pub fn contention_profile(
    mode: ArbiterMode,
    requesters: usize,
    size: u64,
) -> Result<Simulation, SimError> {
    let mut sim = Simulation::new(SimConfig::default())?;
    let src = MemoryId::from("dram");
    let dst = MemoryId::from("sram");
    let arb = ArbiterId::from("arb");
    sim.add_memory(src.clone(), MemoryConfig::default())?;
    sim.add_memory(dst.clone(), MemoryConfig::default())?;
    sim.add_channel(Channel::new("bus", ChannelConfig::default())?)?;
    sim.add_arbiter(Arbiter::new(arb.clone(), mode))?;
    sim.attach(&arb, &"bus".into())?;
    for i in 0..requesters {
        let name = RequesterId::new(format!("pe{i:03}"));
        sim.add_requester(&arb, name.clone())?;
        let id = sim.alloc(&src, size, None)?;
        sim.request(&arb, name, id, dst.clone())?;
    }
    Ok(sim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_settles() {
        let mut sim = contention_profile(ArbiterMode::Shared, 8, 256).unwrap();
        sim.run_until_quiescent(1_000).unwrap();
        assert!(sim.is_quiescent());
        assert_eq!(sim.metrics().transfers_completed, 8);
    }
}
