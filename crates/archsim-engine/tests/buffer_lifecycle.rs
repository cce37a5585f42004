//! Buffer lifecycle driven through the simulation boundary.

use archsim_core::{BufferDescriptor, BufferId, BufferState, ErrorClass, Message, PoolError};
use archsim_engine::{ArbiterMode, SimError};
use archsim_test_utils::{state_timeline, BusKind, Rig};

#[test]
fn transfer_round_trip_moves_allocated_bytes() {
    let mut rig = Rig::new(ArbiterMode::Shared, BusKind::Read, 128);
    let sram = Rig::destination();
    let before = rig.sim.pool().total_allocated_bytes(&sram);

    let id = rig.alloc(4096);
    rig.sim.post(Message::BufferTransfer {
        buffer: BufferDescriptor::new(id, 4096),
        requester: Rig::requester(0),
        arbiter: Rig::arbiter(),
        destination: sram.clone(),
    });
    rig.settle(200);
    assert_eq!(rig.sim.pool().total_allocated_bytes(&sram), before + 4096);
    assert_eq!(rig.sim.pool().total_allocated_bytes(&Rig::source()), 0);

    rig.sim.post(Message::BufferConsume { buffer_id: id });
    rig.sim.step().unwrap();
    assert_eq!(rig.sim.pool().total_allocated_bytes(&sram), before);
    assert_eq!(rig.sim.pool().owner(id).unwrap(), None);
}

#[test]
fn write_timeline_walks_every_state() {
    let mut rig = Rig::new(ArbiterMode::Shared, BusKind::Write, 128);
    let id = rig.request(0, 256);
    rig.settle(100);
    rig.sim.begin_use(&Rig::destination(), id).unwrap();
    rig.sim.run(3).unwrap();
    rig.sim.dealloc(&Rig::destination(), id).unwrap();

    assert_eq!(
        state_timeline(rig.sim.pool(), id),
        [
            (BufferState::Allocated, 0),
            (BufferState::Transit, 0),
            (BufferState::Arrived, 7),
            (BufferState::Responded, 12),
            (BufferState::InUse, 12),
            (BufferState::Deallocated, 15),
        ]
    );
}

#[test]
fn source_keeps_ownership_in_transit() {
    let mut rig = Rig::new(ArbiterMode::Shared, BusKind::Read, 128);
    let id = rig.request(0, 128);
    rig.sim.step().unwrap();
    let pool = rig.sim.pool();
    assert_eq!(pool.state(id).unwrap(), BufferState::Transit);
    assert_eq!(pool.owner(id).unwrap(), Some(&Rig::source()));
    assert_eq!(pool.get(id).unwrap().destination(), Some(&Rig::destination()));
}

#[test]
fn consume_in_transit_is_rejected() {
    let mut rig = Rig::new(ArbiterMode::Shared, BusKind::Read, 128);
    let id = rig.request(0, 128);
    rig.sim.step().unwrap();
    rig.sim.post(Message::BufferConsume { buffer_id: id });
    let err = rig.sim.step().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Lifecycle);
}

#[test]
fn consume_errors_distinguish_unknown_from_finished() {
    let mut rig = Rig::new(ArbiterMode::Shared, BusKind::Read, 128);
    let id = rig.alloc(64);
    rig.sim.post(Message::BufferConsume { buffer_id: id });
    rig.sim.step().unwrap();

    rig.sim.post(Message::BufferConsume { buffer_id: id });
    let err = rig.sim.step().unwrap_err();
    assert_eq!(err, SimError::Pool(PoolError::AlreadyDeallocated { id }));
    assert_eq!(err.class(), ErrorClass::Ownership);

    rig.sim.post(Message::BufferConsume {
        buffer_id: BufferId(1_000),
    });
    let err = rig.sim.step().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Lookup);
}

#[test]
fn transfer_of_moving_buffer_is_rejected() {
    let mut rig = Rig::new(ArbiterMode::Shared, BusKind::Read, 128);
    let id = rig.request(0, 128);
    rig.sim.step().unwrap();
    let err = rig
        .sim
        .request(&Rig::arbiter(), Rig::requester(1), id, Rig::destination())
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Lifecycle);
}

#[test]
fn same_seed_same_content() {
    use archsim_engine::SimConfig;
    let config = SimConfig {
        seed: 99,
        ..SimConfig::default()
    };
    let mut a = Rig::with_config(config.clone(), ArbiterMode::Shared, BusKind::Read, 128);
    let mut b = Rig::with_config(config, ArbiterMode::Shared, BusKind::Read, 128);
    let ia = a.alloc(512);
    let ib = b.alloc(512);
    assert_eq!(
        a.sim.pool().get(ia).unwrap().content(),
        b.sim.pool().get(ib).unwrap().content()
    );
}

#[test]
fn transfer_descriptor_must_match_the_pool() {
    let mut rig = Rig::new(ArbiterMode::Shared, BusKind::Read, 128);
    let id = rig.alloc(64);
    let mut content = rig.sim.pool().get(id).unwrap().content().to_vec();

    rig.sim.post(Message::BufferTransfer {
        buffer: BufferDescriptor::new(id, 32),
        requester: Rig::requester(0),
        arbiter: Rig::arbiter(),
        destination: Rig::destination(),
    });
    let err = rig.sim.step().unwrap_err();
    assert_eq!(
        err,
        SimError::Pool(PoolError::DescriptorMismatch { id, field: "size" })
    );

    content[0] ^= 0xff;
    rig.sim.post(Message::BufferTransfer {
        buffer: BufferDescriptor {
            id,
            size: 64,
            content: Some(content.clone()),
        },
        requester: Rig::requester(0),
        arbiter: Rig::arbiter(),
        destination: Rig::destination(),
    });
    let err = rig.sim.step().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Lookup);
    assert_eq!(rig.sim.pool().state(id).unwrap(), BufferState::Allocated);

    content[0] ^= 0xff;
    rig.sim.post(Message::BufferTransfer {
        buffer: BufferDescriptor {
            id,
            size: 64,
            content: Some(content),
        },
        requester: Rig::requester(0),
        arbiter: Rig::arbiter(),
        destination: Rig::destination(),
    });
    rig.settle(50);
    assert_eq!(rig.sim.pool().state(id).unwrap(), BufferState::Responded);
}
