//! A producer/consumer handshake through buffer-state triggers.
//!
//! A DMA engine writes a tile into SRAM over a write bus. A compute
//! element waits on semaphore 0 of station `sync`; the tile signals
//! that semaphore once the write is acknowledged. Triggers come in as
//! JSON descriptors, the way a topology file would supply them.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example semaphore_triggers

use archsim_channel::{Channel, WriteBusConfig};
use archsim_core::{BufferDescriptor, ClientId, Message, MemoryId};
use archsim_engine::{Arbiter, ArbiterMode, MemoryConfig, SimConfig, SimError, Simulation};
use archsim_semaphore::{SemaphoreStation, StationConfig};
use tracing_subscriber::EnvFilter;

const TILE_DONE: &str =
    r#"{"on": "responded", "action": "signal", "station": "sync", "index": 0}"#;
const TILE_FREED: &str =
    r#"{"on": "deallocated", "action": "signal", "station": "sync", "index": 1}"#;

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut sim = Simulation::new(SimConfig {
        seed: 7,
        ..SimConfig::default()
    })?;
    let host = MemoryId::from("host");
    let sram = MemoryId::from("sram");
    sim.add_memory(host.clone(), MemoryConfig::default())?;
    sim.add_memory(
        sram.clone(),
        MemoryConfig {
            capacity_bytes: Some(64 * 1024),
        },
    )?;
    sim.add_station(SemaphoreStation::new("sync", StationConfig::default())?)?;
    sim.add_channel(Channel::write_bus("wr", WriteBusConfig::default())?)?;
    sim.add_arbiter(Arbiter::new("dma", ArbiterMode::Scheduled))?;
    sim.add_requester(&"dma".into(), "dma0")?;
    sim.attach(&"dma".into(), &"wr".into())?;

    let tile = sim.alloc(&host, 1024, None)?;
    sim.add_trigger_json(tile, TILE_DONE)?;
    sim.add_trigger_json(tile, TILE_FREED)?;

    sim.post(Message::SemWait {
        station: "sync".into(),
        index: 0,
        client: ClientId::from("compute0"),
    });
    sim.post(Message::BufferTransfer {
        buffer: BufferDescriptor::new(tile, 1024),
        requester: "dma0".into(),
        arbiter: "dma".into(),
        destination: sram.clone(),
    });
    sim.run_until_quiescent(1_000)?;

    // The compute element was granted; it uses the tile and frees it.
    sim.begin_use(&sram, tile)?;
    sim.run(4)?;
    sim.wait(&"sync".into(), 1, ClientId::from("dma0"))?;
    sim.dealloc(&sram, tile)?;

    for g in sim.grants() {
        println!(
            "tick {:>3}: {} granted on {}[{}]",
            g.tick, g.client, g.station, g.index
        );
    }
    let m = sim.metrics();
    println!(
        "{} ticks, {} bytes moved, {} triggers fired, {} grants",
        m.ticks, m.bytes_transferred, m.triggers_fired, m.grants
    );
    Ok(())
}
