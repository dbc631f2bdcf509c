//! Message definitions for peer-to-peer session sync.
//!
//! All messages use postcard serialization for compact binary encoding.

use serde::{Deserialize, Serialize};
use tileforge_core::ItemKind;
use tileforge_sim::{Entity, EntityKind, Facing};
use tileforge_world::{BlockChange, WallChange};

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u16 = 1;

/// Protocol magic bytes mixed into the schema hash.
pub const PROTOCOL_MAGIC: &[u8; 8] = b"TILEFRG\x01";

/// Maximum length of a chat message (characters).
pub const MAX_CHAT_LEN: usize = 256;

/// Maximum length of a chat author or sender id (bytes).
pub const MAX_NAME_LEN: usize = 64;

/// Maximum entries per change list in INIT_SYNC.
///
/// The host compacts its log to one entry per cell, so a list never needs
/// more entries than the grid has cells.
pub const MAX_CHANGES: usize = 1 << 20;

/// Maximum hostiles in one ENEMY_SYNC.
pub const MAX_ENEMIES: usize = 256;

/// Largest world side accepted from INIT_SYNC.
pub const MAX_WORLD_SIDE: u32 = 8192;

/// Snapshot of one hostile as broadcast by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Map key.
    pub id: String,
    /// Hostile kind.
    pub kind: EntityKind,
    /// Centre x in tiles.
    pub x: f32,
    /// Centre y in tiles.
    pub y: f32,
    /// Velocity x.
    pub vx: f32,
    /// Velocity y.
    pub vy: f32,
    /// Current health.
    pub health: f32,
    /// Facing.
    pub facing: Facing,
}

impl EnemySnapshot {
    /// Capture a simulated hostile.
    pub fn capture(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            kind: entity.kind,
            x: entity.body.pos.x,
            y: entity.body.pos.y,
            vx: entity.body.vel.x,
            vy: entity.body.vel.y,
            health: entity.health,
            facing: entity.facing,
        }
    }

    fn is_finite(&self) -> bool {
        [self.x, self.y, self.vx, self.vy, self.health]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Messages exchanged between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetMessage {
    /// Joiner to host: send me your state.
    RequestInit {
        /// Joiner's schema hash.
        schema: u64,
    },
    /// Host to joiner: full bootstrap.
    InitSync {
        /// Generation seed.
        seed: u32,
        /// World width in tiles.
        width: u32,
        /// World height in tiles.
        height: u32,
        /// Block mutations since generation, in order.
        changes: Vec<BlockChange>,
        /// Wall mutations since generation, in order.
        wall_changes: Vec<WallChange>,
        /// Host world time.
        time: f64,
    },
    /// Periodic player transform.
    PlayerMove {
        /// Centre x.
        x: f32,
        /// Centre y.
        y: f32,
        /// Velocity x.
        vx: f32,
        /// Velocity y.
        vy: f32,
        /// Facing.
        facing: Facing,
        /// Item in hand.
        held_item: Option<ItemKind>,
        /// Animation clock.
        anim_timer: f32,
    },
    /// A block was placed or broken.
    WorldChange {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Raw block id.
        block: u8,
    },
    /// A wall was placed.
    WallChange {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Raw wall id.
        wall: u8,
    },
    /// Host to all: every live hostile.
    EnemySync {
        /// Full hostile set.
        enemies: Vec<EnemySnapshot>,
    },
    /// A hostile was struck.
    EnemyHit {
        /// Hostile id.
        id: String,
        /// Damage dealt.
        damage: f32,
        /// Knockback x.
        vx: f32,
        /// Knockback y.
        vy: f32,
    },
    /// Host to all: world clock correction.
    TimeSync {
        /// Host world time.
        time: f64,
    },
    /// Chat line.
    Chat {
        /// Message text.
        text: String,
        /// Display name.
        author: String,
        /// Display colour as `0xRRGGBB`.
        color: u32,
    },
    /// Host to all: a peer's connection closed.
    PeerLeft {
        /// Departed peer id.
        peer: String,
    },
}

impl NetMessage {
    /// Frame tag for this message type.
    pub fn tag(&self) -> u8 {
        match self {
            NetMessage::RequestInit { .. } => 0,
            NetMessage::InitSync { .. } => 1,
            NetMessage::PlayerMove { .. } => 2,
            NetMessage::WorldChange { .. } => 3,
            NetMessage::WallChange { .. } => 4,
            NetMessage::EnemySync { .. } => 5,
            NetMessage::EnemyHit { .. } => 6,
            NetMessage::TimeSync { .. } => 7,
            NetMessage::Chat { .. } => 8,
            NetMessage::PeerLeft { .. } => 9,
        }
    }

    /// Upper-case wire name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NetMessage::RequestInit { .. } => "REQUEST_INIT",
            NetMessage::InitSync { .. } => "INIT_SYNC",
            NetMessage::PlayerMove { .. } => "PLAYER_MOVE",
            NetMessage::WorldChange { .. } => "WORLD_CHANGE",
            NetMessage::WallChange { .. } => "WALL_CHANGE",
            NetMessage::EnemySync { .. } => "ENEMY_SYNC",
            NetMessage::EnemyHit { .. } => "ENEMY_HIT",
            NetMessage::TimeSync { .. } => "TIME_SYNC",
            NetMessage::Chat { .. } => "CHAT",
            NetMessage::PeerLeft { .. } => "PEER_LEFT",
        }
    }

    /// Kinds only the host may originate.
    pub fn is_host_authoritative(&self) -> bool {
        matches!(
            self,
            NetMessage::InitSync { .. }
                | NetMessage::EnemySync { .. }
                | NetMessage::TimeSync { .. }
                | NetMessage::PeerLeft { .. }
        )
    }

    /// Verify message limits and validity.
    ///
    /// Called on every received message before it is queued.
    pub fn verify(&self) -> Result<(), &'static str> {
        match self {
            NetMessage::InitSync {
                width,
                height,
                changes,
                wall_changes,
                time,
                ..
            } => {
                if *width == 0 || *height == 0 || *width > MAX_WORLD_SIDE || *height > MAX_WORLD_SIDE {
                    return Err("World dimensions out of range");
                }
                let cells = (*width as usize) * (*height as usize);
                let limit = MAX_CHANGES.min(cells);
                if changes.len() > limit || wall_changes.len() > limit {
                    return Err("Too many changes");
                }
                if !time.is_finite() || *time < 0.0 {
                    return Err("Invalid world time");
                }
            }
            NetMessage::PlayerMove {
                x,
                y,
                vx,
                vy,
                anim_timer,
                ..
            } => {
                if ![x, y, vx, vy, anim_timer].iter().all(|v| v.is_finite()) {
                    return Err("Non-finite player transform");
                }
            }
            NetMessage::EnemySync { enemies } => {
                if enemies.len() > MAX_ENEMIES {
                    return Err("Too many enemies");
                }
                if enemies.iter().any(|e| !e.is_finite() || e.id.len() > MAX_NAME_LEN) {
                    return Err("Invalid enemy snapshot");
                }
            }
            NetMessage::EnemyHit { id, damage, vx, vy } => {
                if id.len() > MAX_NAME_LEN || ![damage, vx, vy].iter().all(|v| v.is_finite()) {
                    return Err("Invalid enemy hit");
                }
            }
            NetMessage::TimeSync { time } => {
                if !time.is_finite() || *time < 0.0 {
                    return Err("Invalid world time");
                }
            }
            NetMessage::Chat { text, author, .. } => {
                if text.chars().count() > MAX_CHAT_LEN {
                    return Err("Chat message too long");
                }
                if author.len() > MAX_NAME_LEN {
                    return Err("Author name too long");
                }
            }
            NetMessage::PeerLeft { peer } => {
                if peer.is_empty() || peer.len() > MAX_NAME_LEN {
                    return Err("Invalid peer id");
                }
            }
            NetMessage::RequestInit { .. } | NetMessage::WorldChange { .. } | NetMessage::WallChange { .. } => {}
        }
        Ok(())
    }
}

/// A message plus the id of the peer that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Payload.
    pub message: NetMessage,
    /// Originating peer; relays keep the original value.
    pub sender_id: String,
}

impl Envelope {
    /// Wrap a message from `sender_id`.
    pub fn new(sender_id: impl Into<String>, message: NetMessage) -> Self {
        Self {
            message,
            sender_id: sender_id.into(),
        }
    }

    /// Verify sender id and message limits.
    pub fn verify(&self) -> Result<(), &'static str> {
        if self.sender_id.is_empty() || self.sender_id.len() > MAX_NAME_LEN {
            return Err("Invalid sender id");
        }
        self.message.verify()
    }
}

/// Compute the schema hash exchanged in REQUEST_INIT.
///
/// Peers built from different protocol revisions produce different hashes.
pub fn compute_schema_hash() -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&PROTOCOL_VERSION.to_le_bytes());
    hasher.update(PROTOCOL_MAGIC);
    for name in [
        "REQUEST_INIT",
        "INIT_SYNC",
        "PLAYER_MOVE",
        "WORLD_CHANGE",
        "WALL_CHANGE",
        "ENEMY_SYNC",
        "ENEMY_HIT",
        "TIME_SYNC",
        "CHAT",
        "PEER_LEFT",
    ] {
        hasher.update(name.as_bytes());
    }
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_hash_is_stable_and_non_zero() {
        assert_eq!(compute_schema_hash(), compute_schema_hash());
        assert_ne!(compute_schema_hash(), 0);
    }

    #[test]
    fn chat_limit_counts_characters() {
        let ok = NetMessage::Chat {
            text: "é".repeat(MAX_CHAT_LEN),
            author: "host".into(),
            color: 0xffffff,
        };
        assert!(ok.verify().is_ok());
        let long = NetMessage::Chat {
            text: "a".repeat(MAX_CHAT_LEN + 1),
            author: "host".into(),
            color: 0xffffff,
        };
        assert_eq!(long.verify(), Err("Chat message too long"));
    }

    #[test]
    fn non_finite_transforms_are_rejected() {
        let msg = NetMessage::PlayerMove {
            x: f32::NAN,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            facing: Facing::Left,
            held_item: None,
            anim_timer: 0.0,
        };
        assert!(msg.verify().is_err());
        assert!(Envelope::new("", NetMessage::TimeSync { time: 1.0 }).verify().is_err());
    }

    #[test]
    fn init_sync_cannot_exceed_one_change_per_cell() {
        let change = BlockChange {
            x: 0,
            y: 0,
            block: tileforge_world::BlockId::Dirt,
        };
        let init = |changes: Vec<BlockChange>| NetMessage::InitSync {
            seed: 1,
            width: 2,
            height: 2,
            changes,
            wall_changes: Vec::new(),
            time: 0.0,
        };
        assert!(init(vec![change; 4]).verify().is_ok());
        assert_eq!(init(vec![change; 5]).verify(), Err("Too many changes"));
    }
}
