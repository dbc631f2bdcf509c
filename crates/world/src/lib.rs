#![warn(missing_docs)]
//! Tile grid, seeded generation, lighting and world time.

mod error;
mod grid;
pub mod lighting;
pub mod noise;
mod rng;
mod snapshot;
pub mod structures;
mod terrain;
mod tile;
mod time;
mod trees;

pub use error::{WorldError, WorldGenError};
pub use grid::{BlockChange, ChangeLog, DirtyRegion, TileWorld, WallChange, BOUNDARY_ROWS};
pub use lighting::{LightingConfig, LightingEngine};
pub use noise::SeededNoise;
pub use rng::Lcg;
pub use snapshot::{PlayerRecord, WorldSnapshot};
pub use structures::{PlacedStructure, StructureKind, StructureParams};
pub use terrain::{
    GenerationParams, GenerationStats, OreRule, WorldDimensions, WorldGenerator,
};
pub use tile::{BlockId, WallId};
pub use time::{WorldClock, DAY_LENGTH};
pub use trees::TreeParams;

impl TileWorld {
    /// Generate a default-sized world from a seed.
    pub fn generate(seed: u32) -> Result<Self, WorldGenError> {
        WorldGenerator::new(seed).generate()
    }
}
