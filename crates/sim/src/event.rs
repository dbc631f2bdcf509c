//! Events produced by a simulation tick.
//!
//! The peer driver turns world and combat events into outbound network
//! messages; the rest are informational.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tileforge_world::{BlockId, WallId};

use crate::entity::EntityKind;

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Local action changed a block.
    BlockChanged {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// New value.
        block: BlockId,
    },
    /// Local action changed a wall.
    WallChanged {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// New value.
        wall: WallId,
    },
    /// Local melee hit a hostile.
    EnemyHit {
        /// Enemy id.
        id: String,
        /// Damage dealt.
        damage: f32,
        /// Knockback velocity applied.
        knockback: Vec2,
    },
    /// A hostile died.
    EnemyKilled {
        /// Enemy id.
        id: String,
    },
    /// The host spawned a hostile.
    EnemySpawned {
        /// Enemy id.
        id: String,
        /// Kind spawned.
        kind: EntityKind,
    },
    /// The local player took contact damage.
    PlayerDamaged {
        /// Damage after armor.
        amount: f32,
        /// Attacker id.
        source: String,
    },
    /// The local player died.
    PlayerDied,
    /// The local player respawned.
    PlayerRespawned,
    /// A tool or weapon reached zero durability.
    ItemBroke,
}

impl SimEvent {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::BlockChanged { .. } => "block_changed",
            SimEvent::WallChanged { .. } => "wall_changed",
            SimEvent::EnemyHit { .. } => "enemy_hit",
            SimEvent::EnemyKilled { .. } => "enemy_killed",
            SimEvent::EnemySpawned { .. } => "enemy_spawned",
            SimEvent::PlayerDamaged { .. } => "player_damaged",
            SimEvent::PlayerDied => "player_died",
            SimEvent::PlayerRespawned => "player_respawned",
            SimEvent::ItemBroke => "item_broke",
        }
    }
}
