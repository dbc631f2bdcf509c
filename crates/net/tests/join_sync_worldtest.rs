//! Join-and-sync worldtest
//!
//! Drives a host and a joiner over in-memory channels by hand: the host
//! mutates its world, the joiner connects late, bootstraps from INIT_SYNC and
//! then follows live WORLD_CHANGE traffic until both grids fingerprint equal.

use glam::Vec2;
use tileforge_net::{
    sync, Applied, Broadcaster, NetMessage, PeerSession, Reconciler, SessionEvent, Switchboard,
};
use tileforge_sim::{EntityKind, SimEvent, SimulationState};
use tileforge_testkit::world_fingerprint;
use tileforge_world::{BlockId, GenerationParams, WallId, WorldDimensions, WorldGenerator};

fn state(seed: u32, id: &str, is_host: bool) -> SimulationState {
    let dims = WorldDimensions {
        width: 120,
        height: 100,
    };
    let world = WorldGenerator::with_params(seed, dims, GenerationParams::default())
        .generate()
        .expect("world generation");
    SimulationState::new(world, id, is_host)
}

fn pump(session: &mut PeerSession, reconciler: &mut Reconciler, state: &mut SimulationState) {
    let mut init_requests = Vec::new();
    for inbound in session.receive() {
        if !session.is_synced() && !matches!(inbound.envelope.message, NetMessage::InitSync { .. }) {
            continue;
        }
        match reconciler.apply(state, &inbound).expect("apply inbound") {
            Applied::InitRequested { link } => init_requests.push(link),
            Applied::Bootstrapped { .. } => session.complete_bootstrap(),
            _ => {}
        }
    }
    for link in init_requests {
        session.send_to(&link, sync::init_sync(state));
        session.mark_synced(&link);
    }
}

#[test]
fn late_joiner_converges_on_host_world() {
    println!("\n=== Join Sync Worldtest ===");
    let board = Switchboard::new();
    let mut listener = board.open_room("host").expect("open room");

    let mut host = state(4242, "host", true);
    let mut host_session: PeerSession = PeerSession::host("host");
    let mut host_reconciler = Reconciler::default();

    // Mutations made before anyone joined.
    for x in 20..30 {
        let y = host.world.surface_row(x).expect("surface") as i32;
        host.world.set_block(x, y, BlockId::Air);
    }
    host.world.set_wall(25, 10, WallId::Brick);
    host.clock.sync(9000.0);
    host.insert_enemy(EntityKind::Zombie, Vec2::new(40.0, 30.0));
    println!("Host changes before join: {}", host.world.change_log().len());

    // The joiner starts from an unrelated world.
    let mut joiner = state(1, "joiner", false);
    let mut joiner_session: PeerSession = PeerSession::joiner("joiner");
    let mut joiner_reconciler = Reconciler::default();
    let channel = board.connect("host", "joiner").expect("connect");
    joiner_session.add_link("host", channel);
    let pending = listener.try_accept().expect("pending joiner");
    host_session.add_link(pending.peer_id, pending.channel);

    let mut broadcaster = Broadcaster::default();
    for frame in 0..30 {
        pump(&mut joiner_session, &mut joiner_reconciler, &mut joiner);
        joiner_session.flush();
        pump(&mut host_session, &mut host_reconciler, &mut host);

        let mut events = Vec::new();
        if frame == 10 {
            let y = host.world.surface_row(60).expect("surface") as i32;
            host.world.set_block(60, y, BlockId::Air);
            events.push(SimEvent::BlockChanged {
                x: 60,
                y,
                block: BlockId::Air,
            });
        }
        for message in broadcaster.collect(&host, &events, 1.0) {
            host_session.broadcast(message);
        }
        host_session.flush();
    }
    pump(&mut joiner_session, &mut joiner_reconciler, &mut joiner);

    let host_print = world_fingerprint(&host.world);
    let joiner_print = world_fingerprint(&joiner.world);
    println!("Host fingerprint:   {host_print}");
    println!("Joiner fingerprint: {joiner_print}");

    assert!(joiner_session.is_synced());
    assert_eq!(host_print, joiner_print);
    assert_eq!(joiner.world.change_log(), host.world.change_log());
    assert!(joiner.clock.time >= 9000.0);
    assert_eq!(
        joiner.enemies.keys().collect::<Vec<_>>(),
        host.enemies.keys().collect::<Vec<_>>()
    );
    assert!(joiner.players.contains_key("host"), "host player replicated");
    assert!(host_session
        .drain_events()
        .contains(&SessionEvent::PeerJoined {
            peer: "joiner".into()
        }));
    println!("Joiner converged on the host world");
}
