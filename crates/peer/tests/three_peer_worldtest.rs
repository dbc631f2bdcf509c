//! Three-peer session worldtest
//!
//! A host and two joiners run full frames over the in-memory switchboard.
//! Each peer mines a different surface tile through its own input; after a
//! few idle frames every grid must fingerprint the same. The session then
//! loses one joiner, which the remaining joiner hears about on its next
//! frame, and finally the host.

use glam::Vec2;
use tileforge_core::DebugToggles;
use tileforge_net::{Role, SessionEvent, Switchboard};
use tileforge_peer::{Peer, PeerConfig};
use tileforge_sim::InputSnapshot;
use tileforge_testkit::world_fingerprint;
use tileforge_world::{BlockId, WorldDimensions};

const ROOM: &str = "meadow";

fn dims() -> WorldDimensions {
    WorldDimensions {
        width: 140,
        height: 110,
    }
}

fn mine_at(peer: &Peer, x: i32) -> (InputSnapshot, i32) {
    let y = peer.state().world.surface_row(x).expect("surface") as i32;
    let input = InputSnapshot {
        aim: Vec2::new(x as f32 + 0.5, y as f32 + 0.5),
        primary: true,
        ..InputSnapshot::idle()
    };
    (input, y)
}

fn frame_all(peers: &mut [&mut Peer], frames: usize) {
    let idle = InputSnapshot::idle();
    for _ in 0..frames {
        for peer in peers.iter_mut() {
            peer.frame(&idle, 1.0);
        }
    }
}

#[test]
fn three_peers_converge_then_survive_departures() {
    println!("\n=== Three Peer Worldtest ===");
    let board = Switchboard::new();
    let mut listener = board.open_room(ROOM).expect("open room");

    let mut host: Peer = Peer::from_seed("host", Role::Host, 777, dims(), PeerConfig::headless()).expect("host world");
    let mut alice: Peer =
        Peer::from_seed("alice", Role::Joiner, 1, dims(), PeerConfig::headless()).expect("alice world");
    let mut bob: Peer = Peer::from_seed("bob", Role::Joiner, 2, dims(), PeerConfig::headless()).expect("bob world");

    for joiner in [&mut alice, &mut bob] {
        let id = joiner.local_id().to_string();
        joiner.connect("host", board.connect(ROOM, &id).expect("connect"));
        let pending = listener.try_accept().expect("pending link");
        host.connect(pending.peer_id, pending.channel);
    }

    frame_all(&mut [&mut alice, &mut bob, &mut host], 8);
    assert!(alice.is_synced() && bob.is_synced(), "joiners bootstrapped");
    assert_eq!(host.session().synced_links(), 2);
    println!("Joiners synced after 8 frames");

    for peer in [&mut host, &mut alice, &mut bob] {
        peer.state_mut().debug.toggles |= DebugToggles::INSTA_MINE | DebugToggles::INFINITE_REACH;
    }

    let (host_dig, host_y) = mine_at(&host, 30);
    let (alice_dig, alice_y) = mine_at(&alice, 70);
    let (bob_dig, bob_y) = mine_at(&bob, 110);
    let idle = InputSnapshot::idle();
    alice.frame(&alice_dig, 1.0);
    bob.frame(&bob_dig, 1.0);
    host.frame(&host_dig, 1.0);
    for _ in 0..6 {
        alice.frame(&idle, 1.0);
        bob.frame(&idle, 1.0);
        host.frame(&idle, 1.0);
    }

    let prints: Vec<String> = [&host, &alice, &bob]
        .iter()
        .map(|peer| world_fingerprint(&peer.state().world))
        .collect();
    for (peer, print) in ["host", "alice", "bob"].iter().zip(&prints) {
        println!("{peer:>5}: {print}");
    }
    assert_eq!(prints[0], prints[1]);
    assert_eq!(prints[0], prints[2]);
    for peer in [&host, &alice, &bob] {
        let world = &peer.state().world;
        assert_eq!(world.block(30, host_y), Some(BlockId::Air));
        assert_eq!(world.block(70, alice_y), Some(BlockId::Air));
        assert_eq!(world.block(110, bob_y), Some(BlockId::Air));
    }
    assert!(alice.state().players.contains_key("bob"), "relayed joiner visible");
    assert!(bob.state().players.contains_key("alice"), "relayed joiner visible");

    bob.disconnect();
    let report = host.frame(&idle, 1.0);
    assert!(report
        .session_events
        .contains(&SessionEvent::PeerLeft { peer: "bob".into() }));
    assert!(!host.state().players.contains_key("bob"));
    alice.frame(&idle, 1.0);
    assert!(!alice.state().players.contains_key("bob"), "departure relayed to alice");
    println!("Host and alice dropped bob's player");

    host.disconnect();
    let report = alice.frame(&idle, 1.0);
    assert!(report.session_events.contains(&SessionEvent::HostLost));
    assert_eq!(alice.state().players.len(), 1);
    let tick = alice.state().tick;
    alice.frame(&idle, 1.0);
    assert!(alice.state().tick > tick, "joiner keeps simulating alone");
    println!("Alice continues after losing the host");
}
