//! Outbound side of replication: which messages a peer sends each frame.

use serde::{Deserialize, Serialize};
use tileforge_sim::{SimEvent, SimulationState};
use tracing::trace;

use crate::protocol::{EnemySnapshot, NetMessage, MAX_ENEMIES};

/// Broadcast cadence and remote-player smoothing, in 60 Hz frame units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Frames between PLAYER_MOVE broadcasts (25 Hz).
    pub player_move_interval: f32,
    /// Frames between host ENEMY_SYNC broadcasts (10 Hz).
    pub enemy_sync_interval: f32,
    /// Frames between host TIME_SYNC broadcasts.
    pub time_sync_interval: f32,
    /// Reported deltas larger than this (tiles) snap instead of interpolating.
    pub snap_threshold: f32,
    /// Fraction of the remaining distance covered per frame.
    pub lerp_rate: f32,
    /// Remote players silent for this many frames are dropped.
    pub stale_after: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            player_move_interval: 2.4,
            enemy_sync_interval: 6.0,
            time_sync_interval: 300.0,
            snap_threshold: 4.0,
            lerp_rate: 0.3,
            stale_after: 600.0,
        }
    }
}

/// Accumulators for the periodic broadcasts.
#[derive(Debug, Clone, Default)]
pub struct BroadcastSchedule {
    player_move: f32,
    enemy_sync: f32,
    time_sync: f32,
}

/// Periodic broadcasts due this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueBroadcasts {
    /// Send PLAYER_MOVE.
    pub player_move: bool,
    /// Send ENEMY_SYNC (host only).
    pub enemy_sync: bool,
    /// Send TIME_SYNC (host only).
    pub time_sync: bool,
}

impl BroadcastSchedule {
    /// Advance the accumulators by `dt` frames.
    pub fn advance(&mut self, config: &SyncConfig, dt: f32, is_host: bool) -> DueBroadcasts {
        DueBroadcasts {
            player_move: fire(&mut self.player_move, config.player_move_interval, dt),
            enemy_sync: is_host && fire(&mut self.enemy_sync, config.enemy_sync_interval, dt),
            time_sync: is_host && fire(&mut self.time_sync, config.time_sync_interval, dt),
        }
    }
}

fn fire(acc: &mut f32, interval: f32, dt: f32) -> bool {
    *acc += dt;
    if *acc < interval {
        return false;
    }
    *acc -= interval;
    // a long stall sends once, not a burst
    if *acc >= interval {
        *acc = 0.0;
    }
    true
}

/// Turns local simulation output into outbound messages.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    config: SyncConfig,
    schedule: BroadcastSchedule,
}

impl Broadcaster {
    /// Broadcaster with the given cadence.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            schedule: BroadcastSchedule::default(),
        }
    }

    /// Cadence in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Messages to broadcast after a tick: one per world or combat event, then
    /// whichever periodic snapshots are due.
    pub fn collect(&mut self, state: &SimulationState, events: &[SimEvent], dt: f32) -> Vec<NetMessage> {
        let mut messages: Vec<NetMessage> = events.iter().filter_map(event_message).collect();

        let due = self.schedule.advance(&self.config, dt, state.is_host);
        if due.player_move {
            messages.extend(player_move(state));
        }
        if due.enemy_sync {
            messages.push(enemy_sync(state));
        }
        if due.time_sync {
            messages.push(time_sync(state));
        }
        trace!(count = messages.len(), tick = state.tick.0, "outbound messages");
        messages
    }
}

/// Message announcing a local event, if other peers need it.
pub fn event_message(event: &SimEvent) -> Option<NetMessage> {
    match event {
        SimEvent::BlockChanged { x, y, block } => Some(NetMessage::WorldChange {
            x: *x,
            y: *y,
            block: block.to_u8(),
        }),
        SimEvent::WallChanged { x, y, wall } => Some(NetMessage::WallChange {
            x: *x,
            y: *y,
            wall: wall.to_u8(),
        }),
        SimEvent::EnemyHit {
            id,
            damage,
            knockback,
        } => Some(NetMessage::EnemyHit {
            id: id.clone(),
            damage: *damage,
            vx: knockback.x,
            vy: knockback.y,
        }),
        _ => None,
    }
}

/// Local player transform.
pub fn player_move(state: &SimulationState) -> Option<NetMessage> {
    let player = state.local_player()?;
    Some(NetMessage::PlayerMove {
        x: player.body.pos.x,
        y: player.body.pos.y,
        vx: player.body.vel.x,
        vy: player.body.vel.y,
        facing: player.facing,
        held_item: player.held_item,
        anim_timer: player.anim_timer,
    })
}

/// Every live hostile, in id order.
pub fn enemy_sync(state: &SimulationState) -> NetMessage {
    NetMessage::EnemySync {
        enemies: state
            .enemies
            .values()
            .filter(|enemy| enemy.is_alive())
            .take(MAX_ENEMIES)
            .map(EnemySnapshot::capture)
            .collect(),
    }
}

/// Host clock correction.
pub fn time_sync(state: &SimulationState) -> NetMessage {
    NetMessage::TimeSync {
        time: state.clock.time,
    }
}

/// Full bootstrap for a joiner: seed, dimensions, change log and time.
pub fn init_sync(state: &SimulationState) -> NetMessage {
    let mut log = state.world.change_log().clone();
    log.compact();
    NetMessage::InitSync {
        seed: state.world.seed(),
        width: state.world.width() as u32,
        height: state.world.height() as u32,
        changes: log.blocks,
        wall_changes: log.walls,
        time: state.clock.time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tileforge_sim::EntityKind;
    use tileforge_world::{BlockId, GenerationParams, WorldDimensions, WorldGenerator};

    fn state(is_host: bool) -> SimulationState {
        let dims = WorldDimensions {
            width: 64,
            height: 96,
        };
        let world = WorldGenerator::with_params(3, dims, GenerationParams::default())
            .generate()
            .unwrap();
        SimulationState::new(world, if is_host { "host" } else { "joiner" }, is_host)
    }

    #[test]
    fn player_move_cadence_averages_25_hz() {
        let mut schedule = BroadcastSchedule::default();
        let config = SyncConfig::default();
        let sent = (0..121)
            .filter(|_| schedule.advance(&config, 1.0, false).player_move)
            .count();
        assert_eq!(sent, 50);
    }

    #[test]
    fn joiners_never_send_authoritative_snapshots() {
        let mut broadcaster = Broadcaster::default();
        let joiner = state(false);
        for _ in 0..400 {
            let messages = broadcaster.collect(&joiner, &[], 1.0);
            assert!(messages
                .iter()
                .all(|m| !matches!(m, NetMessage::EnemySync { .. } | NetMessage::TimeSync { .. })));
        }
    }

    #[test]
    fn host_snapshots_follow_their_intervals() {
        let mut broadcaster = Broadcaster::default();
        let mut host = state(true);
        host.insert_enemy(EntityKind::Slime, Vec2::new(10.0, 10.0));
        let mut enemy_syncs = 0;
        let mut time_syncs = 0;
        for _ in 0..300 {
            for message in broadcaster.collect(&host, &[], 1.0) {
                match message {
                    NetMessage::EnemySync { enemies } => {
                        assert_eq!(enemies.len(), 1);
                        enemy_syncs += 1;
                    }
                    NetMessage::TimeSync { .. } => time_syncs += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(enemy_syncs, 50);
        assert_eq!(time_syncs, 1);
    }

    #[test]
    fn world_events_become_messages() {
        let events = [
            SimEvent::BlockChanged {
                x: 4,
                y: 7,
                block: BlockId::Air,
            },
            SimEvent::PlayerDied,
        ];
        let messages: Vec<_> = events.iter().filter_map(event_message).collect();
        assert_eq!(
            messages,
            vec![NetMessage::WorldChange {
                x: 4,
                y: 7,
                block: BlockId::Air.to_u8()
            }]
        );
    }

    #[test]
    fn init_sync_carries_the_change_log() {
        let mut host = state(true);
        let y = host.world.surface_row(5).unwrap() as i32;
        host.world.set_block(5, y, BlockId::Air);
        match init_sync(&host) {
            NetMessage::InitSync {
                seed,
                width,
                changes,
                ..
            } => {
                assert_eq!(seed, 3);
                assert_eq!(width, 64);
                assert_eq!(changes.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn init_sync_sends_one_change_per_cell() {
        let mut host = state(true);
        let y = host.world.surface_row(9).unwrap() as i32 - 3;
        for block in [BlockId::Planks, BlockId::Air, BlockId::Brick, BlockId::Air, BlockId::Brick] {
            host.world.set_block(9, y, block);
        }
        match init_sync(&host) {
            NetMessage::InitSync { changes, .. } => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].block, BlockId::Brick);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
