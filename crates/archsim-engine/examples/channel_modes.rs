//! Shared versus scheduled arbitration on the same read bus.
//!
//! Two processing elements each read 256 bytes from DRAM into SRAM
//! over a 128 B/tick read bus. With a shared arbiter both reads split
//! the bandwidth and land together; with a scheduled arbiter the
//! second waits for the first.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example channel_modes

use archsim_channel::{Channel, ReadBusConfig};
use archsim_core::{BufferState, MemoryId};
use archsim_engine::{Arbiter, ArbiterMode, MemoryConfig, SimConfig, SimError, Simulation};
use tracing_subscriber::EnvFilter;

fn run(mode: ArbiterMode) -> Result<(), SimError> {
    let mut sim = Simulation::new(SimConfig::default())?;
    let dram = MemoryId::from("dram");
    let sram = MemoryId::from("sram");
    sim.add_memory(dram.clone(), MemoryConfig::default())?;
    sim.add_memory(sram.clone(), MemoryConfig::default())?;
    sim.add_channel(Channel::read_bus("rd", ReadBusConfig::default())?)?;
    sim.add_arbiter(Arbiter::new("arb", mode))?;
    let arb = "arb".into();
    for pe in ["pe0", "pe1"] {
        sim.add_requester(&arb, pe)?;
    }
    sim.attach(&arb, &"rd".into())?;

    let mut buffers = Vec::new();
    for pe in ["pe0", "pe1"] {
        let id = sim.alloc(&dram, 256, None)?;
        sim.request(&arb, pe.into(), id, sram.clone())?;
        buffers.push((pe, id));
    }
    let ticks = sim.run_until_quiescent(1_000)?;

    println!("── {mode} ──");
    for (pe, id) in buffers {
        let buf = sim.pool().get(id)?;
        let arrived = buf
            .entered_at(BufferState::Arrived)
            .map_or("-".to_string(), |t| t.to_string());
        println!("  {pe}: {id} arrived at tick {arrived}");
    }
    let bus = sim.channel(&"rd".into())?;
    let stats = bus.stats();
    println!(
        "  settled after {ticks} ticks; bus busy {} ticks, peak {} concurrent, utilization {:.2}",
        stats.busy_ticks,
        stats.peak_concurrency,
        stats.utilization(bus.bandwidth())
    );
    println!("  sram holds {} bytes", sim.pool().total_allocated_bytes(&sram));
    Ok(())
}

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    run(ArbiterMode::Shared)?;
    run(ArbiterMode::Scheduled)?;
    Ok(())
}
