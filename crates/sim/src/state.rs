//! Explicit simulation state owned by the tick driver.

use std::collections::BTreeMap;

use glam::Vec2;
use tileforge_core::{DebugFlags, Loadout, SimTick};
use tileforge_world::{BlockId, PlayerRecord, TileWorld, WorldClock};
use tracing::debug;

use crate::entity::{Entity, EntityKind};

/// Id of the locally simulated guide.
pub const GUIDE_ID: &str = "guide";

/// Block currently being mined by the local player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiningProgress {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Accumulated mining power; the block breaks at its hardness.
    pub progress: f32,
}

/// Local player cooldowns and host spawn timer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionState {
    /// Frames until the next melee swing.
    pub attack_cooldown: f32,
    /// Frames until the next placement.
    pub place_cooldown: f32,
    /// Block in progress, if the primary action is held on one.
    pub mining: Option<MiningProgress>,
    /// Frames until the next spawn attempt (host only).
    pub spawn_timer: f32,
}

/// Everything one peer simulates.
///
/// Entity maps are keyed by id and iterated in key order, so every pass over
/// them is deterministic.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Tile grid.
    pub world: TileWorld,
    /// World time.
    pub clock: WorldClock,
    /// Local and remote players.
    pub players: BTreeMap<String, Entity>,
    /// Hostiles; host-authoritative.
    pub enemies: BTreeMap<String, Entity>,
    /// Friendly NPCs; simulated locally on every peer.
    pub npcs: BTreeMap<String, Entity>,
    /// Id of the input-driven player.
    pub local_id: String,
    /// Whether this peer owns time and hostile AI.
    pub is_host: bool,
    /// Local player's hotbar and armor.
    pub loadout: Loadout,
    /// Debug toggles for the local player.
    pub debug: DebugFlags,
    /// Ticks simulated so far.
    pub tick: SimTick,
    /// Column players respawn at.
    pub spawn_x: i32,
    /// Counter for `enemy-<n>` ids.
    pub next_enemy_id: u64,
    /// Local cooldowns.
    pub actions: ActionState,
}

impl SimulationState {
    /// Fresh state: local player and guide placed on the surface at the spawn column.
    pub fn new(world: TileWorld, local_id: impl Into<String>, is_host: bool) -> Self {
        let local_id = local_id.into();
        let spawn_x = (world.width() / 2) as i32;
        let player = Entity::on_surface(local_id.clone(), EntityKind::Player, &world, spawn_x);
        let guide = Entity::on_surface(GUIDE_ID, EntityKind::Guide, &world, spawn_x + 3);

        let mut players = BTreeMap::new();
        players.insert(local_id.clone(), player);
        let mut npcs = BTreeMap::new();
        npcs.insert(GUIDE_ID.to_string(), guide);

        Self {
            world,
            clock: WorldClock::new(),
            players,
            enemies: BTreeMap::new(),
            npcs,
            local_id,
            is_host,
            loadout: Loadout::starter(BlockId::Planks.to_u8()),
            debug: DebugFlags::default(),
            tick: SimTick::ZERO,
            spawn_x,
            next_enemy_id: 0,
            actions: ActionState::default(),
        }
    }

    /// The input-driven player.
    pub fn local_player(&self) -> Option<&Entity> {
        self.players.get(&self.local_id)
    }

    /// Mutable access to the input-driven player.
    pub fn local_player_mut(&mut self) -> Option<&mut Entity> {
        self.players.get_mut(&self.local_id)
    }

    /// Players other than the local one.
    pub fn remote_players(&self) -> impl Iterator<Item = &Entity> {
        self.players
            .values()
            .filter(move |player| player.id != self.local_id)
    }

    /// Positions of live players.
    pub fn player_positions(&self) -> Vec<Vec2> {
        self.players
            .values()
            .filter(|p| p.is_alive())
            .map(Entity::pos)
            .collect()
    }

    /// Positions of live hostiles.
    pub fn hostile_positions(&self) -> Vec<Vec2> {
        self.enemies
            .values()
            .filter(|e| e.is_alive() && e.kind.is_hostile())
            .map(Entity::pos)
            .collect()
    }

    /// Insert a hostile with the next `enemy-<n>` id, returning the id.
    pub fn insert_enemy(&mut self, kind: EntityKind, pos: Vec2) -> String {
        self.next_enemy_id += 1;
        let id = format!("enemy-{}", self.next_enemy_id);
        self.enemies.insert(id.clone(), Entity::new(id.clone(), kind, pos));
        id
    }

    /// Put the local player back at the spawn column with full health.
    pub fn respawn_local(&mut self) {
        let spawn = Entity::on_surface(self.local_id.clone(), EntityKind::Player, &self.world, self.spawn_x);
        let held_item = self.loadout.selected_item().map(|stack| stack.kind);
        if let Some(player) = self.players.get_mut(&self.local_id) {
            player.body = spawn.body;
            player.health = player.max_health;
            player.invulnerable = 0.0;
            player.held_item = held_item;
            debug!(id = %player.id, x = player.pos().x, y = player.pos().y, "player respawned");
        }
        self.actions.mining = None;
    }

    /// Persistable records for every player; only the local one carries a real loadout.
    pub fn player_records(&self) -> Vec<PlayerRecord> {
        self.players
            .values()
            .map(|player| PlayerRecord {
                id: player.id.clone(),
                x: player.pos().x,
                y: player.pos().y,
                health: player.health,
                loadout: if player.id == self.local_id {
                    self.loadout.clone()
                } else {
                    Loadout::default()
                },
            })
            .collect()
    }

    /// Restore the local player's transform and loadout from a saved record.
    pub fn restore_local(&mut self, record: &PlayerRecord) {
        self.loadout = record.loadout.clone();
        if let Some(player) = self.players.get_mut(&self.local_id) {
            player.body.pos = Vec2::new(record.x, record.y);
            player.body.vel = Vec2::ZERO;
            player.health = record.health.clamp(1.0, player.max_health);
        }
    }
}
