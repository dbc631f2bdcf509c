//! Plain-data world state handed to the persistence collaborator.

use serde::{Deserialize, Serialize};
use tileforge_core::Loadout;

use crate::error::WorldError;
use crate::grid::TileWorld;

/// Saved player transform and inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Entity id.
    pub id: String,
    /// Position x in tiles.
    pub x: f32,
    /// Position y in tiles.
    pub y: f32,
    /// Current health.
    pub health: f32,
    /// Hotbar and armor.
    pub loadout: Loadout,
}

/// Everything needed to resume a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Generation seed.
    pub seed: u32,
    /// Width in tiles.
    pub width: usize,
    /// Height in tiles.
    pub height: usize,
    /// World clock value.
    pub time: f64,
    /// Raw foreground layer.
    pub blocks: Vec<u8>,
    /// Raw background layer.
    pub walls: Vec<u8>,
    /// Saved players.
    pub players: Vec<PlayerRecord>,
}

impl WorldSnapshot {
    /// Capture a world plus the given players.
    pub fn capture(world: &TileWorld, time: f64, players: Vec<PlayerRecord>) -> Self {
        Self {
            seed: world.seed(),
            width: world.width(),
            height: world.height(),
            time,
            blocks: world.block_bytes(),
            walls: world.wall_bytes(),
            players,
        }
    }

    /// Rebuild the tile grid.
    pub fn restore_world(&self) -> Result<TileWorld, WorldError> {
        TileWorld::from_layers(self.width, self.height, self.seed, &self.blocks, &self.walls)
    }
}
