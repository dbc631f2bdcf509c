//! Inbound side of replication: applying remote messages to local state.
//!
//! Block and wall changes are last-write-wins and idempotent. Remote players
//! are smoothed toward their latest reported position, snapping when the gap
//! is large. Hostiles are owned by the host: a joiner replaces its set with
//! every ENEMY_SYNC it receives.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec2;
use tileforge_sim::{apply_enemy_hit, Entity, EntityKind, HitOutcome, SimulationState, GUIDE_ID};
use tileforge_world::{
    BlockId, ChangeLog, GenerationParams, WallId, WorldDimensions, WorldGenerator,
};
use tracing::{debug, info, instrument, warn};

use crate::error::NetError;
use crate::protocol::{EnemySnapshot, NetMessage};
use crate::session::Inbound;
use crate::sync::SyncConfig;

/// Lines kept in the chat log.
pub const CHAT_HISTORY: usize = 100;

/// One received chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Display name.
    pub author: String,
    /// Message text.
    pub text: String,
    /// Display colour as `0xRRGGBB`.
    pub color: u32,
}

/// Bounded history of chat lines, oldest first.
#[derive(Debug, Clone)]
pub struct ChatLog {
    lines: VecDeque<ChatLine>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(CHAT_HISTORY)
    }
}

impl ChatLog {
    /// Log keeping the last `capacity` lines.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest past capacity.
    pub fn push(&mut self, line: ChatLine) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    /// Number of stored lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when no line has been received.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// What applying one inbound message did.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Nothing changed (duplicate, stale, out of range or wrong role).
    Ignored,
    /// Local state was updated.
    Updated,
    /// Host: the link asked for a bootstrap.
    InitRequested {
        /// Link to answer on.
        link: String,
    },
    /// Joiner: the world was rebuilt from INIT_SYNC.
    Bootstrapped {
        /// Entries replayed from the host's change log.
        replayed: usize,
    },
    /// A chat line was logged.
    Chat,
}

#[derive(Debug, Clone, Copy)]
struct RemoteTarget {
    pos: Vec2,
    silent_for: f32,
}

/// Applies inbound messages and smooths remote players.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: SyncConfig,
    targets: BTreeMap<String, RemoteTarget>,
    chat: ChatLog,
}

impl Reconciler {
    /// Reconciler using `config` for snapping, smoothing and staleness.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            targets: BTreeMap::new(),
            chat: ChatLog::default(),
        }
    }

    /// Chat history, received and local lines alike.
    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Log a line typed on this peer.
    pub fn record_local_chat(&mut self, line: ChatLine) {
        self.chat.push(line);
    }

    /// Apply one inbound message.
    ///
    /// Only INIT_SYNC can fail, when the announced world cannot be generated.
    pub fn apply(&mut self, state: &mut SimulationState, inbound: &Inbound) -> Result<Applied, NetError> {
        let sender = inbound.envelope.sender_id.as_str();
        let applied = match &inbound.envelope.message {
            NetMessage::RequestInit { .. } => {
                if !state.is_host {
                    return Ok(Applied::Ignored);
                }
                Applied::InitRequested {
                    link: inbound.link.clone(),
                }
            }
            NetMessage::InitSync { .. } if state.is_host => Applied::Ignored,
            NetMessage::InitSync {
                seed,
                width,
                height,
                changes,
                wall_changes,
                time,
            } => {
                let log = ChangeLog {
                    blocks: changes.clone(),
                    walls: wall_changes.clone(),
                };
                let replayed = bootstrap(state, *seed, *width, *height, &log, *time)?;
                self.targets.clear();
                Applied::Bootstrapped { replayed }
            }
            NetMessage::PlayerMove {
                x,
                y,
                vx,
                vy,
                facing,
                held_item,
                anim_timer,
            } => {
                let reported = Vec2::new(*x, *y);
                let player = state
                    .players
                    .entry(sender.to_string())
                    .or_insert_with(|| {
                        info!(peer = sender, "remote player appeared");
                        Entity::new(sender, EntityKind::Player, reported)
                    });
                if player.body.pos.distance(reported) > self.config.snap_threshold {
                    player.body.pos = reported;
                }
                player.body.vel = Vec2::new(*vx, *vy);
                player.facing = *facing;
                player.held_item = *held_item;
                player.anim_timer = *anim_timer;
                self.targets.insert(
                    sender.to_string(),
                    RemoteTarget {
                        pos: reported,
                        silent_for: 0.0,
                    },
                );
                Applied::Updated
            }
            NetMessage::WorldChange { x, y, block } => {
                let Some(block) = BlockId::from_u8(*block) else {
                    debug!(peer = sender, raw = block, "unknown block id, dropping");
                    return Ok(Applied::Ignored);
                };
                if state.world.set_block(*x, *y, block) {
                    Applied::Updated
                } else {
                    Applied::Ignored
                }
            }
            NetMessage::WallChange { x, y, wall } => {
                let Some(wall) = WallId::from_u8(*wall) else {
                    debug!(peer = sender, raw = wall, "unknown wall id, dropping");
                    return Ok(Applied::Ignored);
                };
                if state.world.set_wall(*x, *y, wall) {
                    Applied::Updated
                } else {
                    Applied::Ignored
                }
            }
            NetMessage::EnemySync { enemies } => {
                if state.is_host {
                    warn!(peer = sender, "host received ENEMY_SYNC, ignoring");
                    return Ok(Applied::Ignored);
                }
                replace_enemies(state, enemies);
                Applied::Updated
            }
            NetMessage::EnemyHit { id, damage, vx, vy } => {
                match apply_enemy_hit(state, id, *damage, Vec2::new(*vx, *vy)) {
                    HitOutcome::Missing => Applied::Ignored,
                    HitOutcome::Hit | HitOutcome::Killed => Applied::Updated,
                }
            }
            NetMessage::TimeSync { time } => {
                if state.is_host {
                    return Ok(Applied::Ignored);
                }
                state.clock.sync(*time);
                Applied::Updated
            }
            NetMessage::Chat {
                text,
                author,
                color,
            } => {
                info!(author = %author, "chat: {text}");
                self.chat.push(ChatLine {
                    author: author.clone(),
                    text: text.clone(),
                    color: *color,
                });
                Applied::Chat
            }
            NetMessage::PeerLeft { peer } => {
                if state.is_host || *peer == state.local_id || !state.players.contains_key(peer.as_str()) {
                    return Ok(Applied::Ignored);
                }
                self.forget_peer(state, peer);
                Applied::Updated
            }
        };
        Ok(applied)
    }

    /// Move remote players toward their targets and drop the ones gone silent.
    pub fn interpolate(&mut self, state: &mut SimulationState, dt: f32) {
        let blend = 1.0 - (1.0 - self.config.lerp_rate).powf(dt);
        let mut stale = Vec::new();
        for (id, target) in self.targets.iter_mut() {
            target.silent_for += dt;
            if target.silent_for > self.config.stale_after {
                stale.push(id.clone());
                continue;
            }
            if let Some(player) = state.players.get_mut(id) {
                player.body.pos += (target.pos - player.body.pos) * blend;
            }
        }
        for id in stale {
            debug!(peer = %id, "remote player went silent");
            self.forget_peer(state, &id);
        }
    }

    /// Remove a departed peer's player.
    pub fn forget_peer(&mut self, state: &mut SimulationState, id: &str) {
        self.targets.remove(id);
        if id != state.local_id && state.players.remove(id).is_some() {
            info!(peer = id, "remote player removed");
        }
    }

    /// Remove every remote player, for example after losing the host.
    pub fn forget_all_remote(&mut self, state: &mut SimulationState) {
        self.targets.clear();
        let local = state.local_id.clone();
        state.players.retain(|id, _| *id == local);
    }
}

#[instrument(skip(state, log), fields(changes = log.len()))]
fn bootstrap(
    state: &mut SimulationState,
    seed: u32,
    width: u32,
    height: u32,
    log: &ChangeLog,
    time: f64,
) -> Result<usize, NetError> {
    let dims = WorldDimensions {
        width: width as usize,
        height: height as usize,
    };
    let mut world = WorldGenerator::with_params(seed, dims, GenerationParams::default()).generate()?;
    let replayed = world.replay(log);

    state.spawn_x = (world.width() / 2) as i32;
    state.world = world;
    state.clock.sync(time);
    state.enemies.clear();
    let local = state.local_id.clone();
    state.players.retain(|id, _| *id == local);
    state.respawn_local();
    state.npcs.insert(
        GUIDE_ID.to_string(),
        Entity::on_surface(GUIDE_ID, EntityKind::Guide, &state.world, state.spawn_x + 3),
    );
    info!(seed, width, height, replayed, "joined session");
    Ok(replayed)
}

fn replace_enemies(state: &mut SimulationState, enemies: &[EnemySnapshot]) {
    let live: BTreeSet<&str> = enemies.iter().map(|e| e.id.as_str()).collect();
    state.enemies.retain(|id, _| live.contains(id.as_str()));
    for snapshot in enemies {
        let pos = Vec2::new(snapshot.x, snapshot.y);
        let enemy = state
            .enemies
            .entry(snapshot.id.clone())
            .or_insert_with(|| Entity::new(snapshot.id.clone(), snapshot.kind, pos));
        if enemy.kind != snapshot.kind {
            *enemy = Entity::new(snapshot.id.clone(), snapshot.kind, pos);
        }
        enemy.body.pos = pos;
        enemy.body.vel = Vec2::new(snapshot.vx, snapshot.vy);
        enemy.health = snapshot.health;
        enemy.facing = snapshot.facing;
    }
}
