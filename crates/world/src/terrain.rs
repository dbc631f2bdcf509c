//! Seeded world generation.
//!
//! Passes run in a fixed order and each may read the output of the previous
//! ones: terrain, caves, ores, structures, vegetation. Every random decision
//! is a pure function of the seed, so any peer can rebuild the same world.

use tracing::{debug, info, instrument};

use crate::error::WorldGenError;
use crate::grid::{GeneratedLayers, TileWorld, BOUNDARY_ROWS};
use crate::noise::SeededNoise;
use crate::rng::Lcg;
use crate::structures::{place_structures, StructureParams};
use crate::tile::{BlockId, WallId};
use crate::trees::{plant_vegetation, TreeParams};

/// Salt mixed into the seed for the placement LCG.
const PLACEMENT_SALT: u32 = 0x9E37_79B9;

/// Grid size in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldDimensions {
    /// Columns.
    pub width: usize,
    /// Rows.
    pub height: usize,
}

impl Default for WorldDimensions {
    fn default() -> Self {
        Self {
            width: 400,
            height: 200,
        }
    }
}

/// One ore channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OreRule {
    /// Block written when the rule fires.
    pub block: BlockId,
    /// Minimum rows below the local surface.
    pub min_depth: usize,
    /// Noise value that must be exceeded.
    pub threshold: f64,
    /// Sampling frequency.
    pub frequency: f64,
    /// Offset separating this channel from the others.
    pub offset: f64,
}

impl OreRule {
    /// Noise sample for this channel at a tile.
    pub fn sample(&self, noise: &SeededNoise, x: usize, y: usize) -> f64 {
        noise.noise2d(
            x as f64 * self.frequency + self.offset,
            y as f64 * self.frequency + self.offset,
        )
    }

    /// Whether the rule fires at a tile `depth` rows below its column surface.
    pub fn matches(&self, noise: &SeededNoise, x: usize, y: usize, depth: usize) -> bool {
        depth >= self.min_depth && self.sample(noise, x, y) > self.threshold
    }
}

/// Tunables for all generation passes.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Lowest possible surface row.
    pub ground_level: usize,
    /// Maximum rise of the surface above `ground_level`.
    pub amplitude: usize,
    /// Dirt rows under the grass row.
    pub dirt_depth: usize,
    /// Horizontal frequency of the height noise.
    pub terrain_frequency: f64,
    /// Octaves summed for the height noise.
    pub terrain_octaves: u32,
    /// Cave noise frequency.
    pub cave_frequency: f64,
    /// `|n|` above this carves a cave.
    pub cave_threshold: f64,
    /// Caves start this many rows under the local surface...
    pub cave_surface_margin: usize,
    /// ...and never above `ground_level` plus this margin.
    pub cave_ground_margin: usize,
    /// Ore channels, evaluated in order; later matches overwrite earlier ones.
    pub ores: Vec<OreRule>,
    /// Structure placement.
    pub structures: StructureParams,
    /// Tree and flower placement.
    pub trees: TreeParams,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            ground_level: 70,
            amplitude: 18,
            dirt_depth: 5,
            terrain_frequency: 0.015,
            terrain_octaves: 3,
            cave_frequency: 0.08,
            cave_threshold: 0.42,
            cave_surface_margin: 8,
            cave_ground_margin: 4,
            ores: vec![
                OreRule {
                    block: BlockId::CoalOre,
                    min_depth: 4,
                    threshold: 0.50,
                    frequency: 0.21,
                    offset: 211.0,
                },
                OreRule {
                    block: BlockId::IronOre,
                    min_depth: 14,
                    threshold: 0.56,
                    frequency: 0.19,
                    offset: 419.0,
                },
                OreRule {
                    block: BlockId::GoldOre,
                    min_depth: 28,
                    threshold: 0.62,
                    frequency: 0.17,
                    offset: 631.0,
                },
                OreRule {
                    block: BlockId::DiamondOre,
                    min_depth: 45,
                    threshold: 0.68,
                    frequency: 0.15,
                    offset: 877.0,
                },
            ],
            structures: StructureParams::default(),
            trees: TreeParams::default(),
        }
    }
}

/// Counts reported by a generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Tiles carved by the cave pass.
    pub cave_tiles: usize,
    /// Stone tiles replaced by ore.
    pub ore_tiles: usize,
    /// Structures stamped.
    pub structures: usize,
    /// Trees planted.
    pub trees: usize,
}

/// Builds a [`TileWorld`] from a seed.
#[derive(Debug, Clone)]
pub struct WorldGenerator {
    seed: u32,
    dims: WorldDimensions,
    params: GenerationParams,
    noise: SeededNoise,
}

impl WorldGenerator {
    /// Generator with default dimensions and parameters.
    pub fn new(seed: u32) -> Self {
        Self::with_params(seed, WorldDimensions::default(), GenerationParams::default())
    }

    /// Generator with explicit dimensions and parameters.
    pub fn with_params(seed: u32, dims: WorldDimensions, params: GenerationParams) -> Self {
        Self {
            seed,
            dims,
            params,
            noise: SeededNoise::new(seed),
        }
    }

    /// Seed in use.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Parameters in use.
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Noise function shared by all passes.
    pub fn noise(&self) -> &SeededNoise {
        &self.noise
    }

    /// Surface row for a column, always within `[ground_level - amplitude, ground_level]`.
    pub fn surface_height(&self, x: usize) -> usize {
        let p = &self.params;
        let n = self
            .noise
            .fbm(x as f64 * p.terrain_frequency, 0.5, p.terrain_octaves);
        let rise = ((n + 1.0) * 0.5 * p.amplitude as f64).round() as usize;
        p.ground_level - rise.min(p.amplitude)
    }

    /// Run every pass and return the finished world.
    #[instrument(skip(self), fields(seed = self.seed, width = self.dims.width, height = self.dims.height))]
    pub fn generate(&self) -> Result<TileWorld, WorldGenError> {
        let (world, stats) = self.generate_with_stats()?;
        info!(
            seed = self.seed,
            caves = stats.cave_tiles,
            ores = stats.ore_tiles,
            structures = stats.structures,
            trees = stats.trees,
            "generated world"
        );
        Ok(world)
    }

    /// Run every pass, also returning per-pass counts.
    pub fn generate_with_stats(&self) -> Result<(TileWorld, GenerationStats), WorldGenError> {
        self.validate()?;
        let WorldDimensions { width, height } = self.dims;
        let mut layers = GeneratedLayers {
            width,
            height,
            blocks: vec![BlockId::Air; width * height],
            walls: vec![WallId::None; width * height],
        };
        let mut stats = GenerationStats::default();

        let heights = self.terrain_pass(&mut layers);
        stats.cave_tiles = self.cave_pass(&mut layers, &heights);
        stats.ore_tiles = self.ore_pass(&mut layers, &heights);

        let mut rng = Lcg::new(self.seed ^ PLACEMENT_SALT);
        let mut occupied = vec![false; width];
        let placed = place_structures(
            &mut layers,
            &heights,
            &mut occupied,
            &mut rng,
            &self.params.structures,
        );
        stats.structures = placed.len();
        stats.trees = plant_vegetation(
            &mut layers,
            &heights,
            &occupied,
            &mut rng,
            &self.params.trees,
        );
        debug!(?stats, "generation passes complete");

        Ok((TileWorld::from_generated(self.seed, layers), stats))
    }

    fn validate(&self) -> Result<(), WorldGenError> {
        let WorldDimensions { width, height } = self.dims;
        if width == 0 || height <= BOUNDARY_ROWS {
            return Err(WorldGenError::InvalidDimensions { width, height });
        }
        let p = &self.params;
        if p.amplitude >= p.ground_level || p.ground_level + BOUNDARY_ROWS >= height {
            return Err(WorldGenError::TerrainOverflow {
                ground_level: p.ground_level,
                amplitude: p.amplitude,
            });
        }
        Ok(())
    }

    fn terrain_pass(&self, layers: &mut GeneratedLayers) -> Vec<usize> {
        let (width, height) = (layers.width, layers.height);
        let dirt_depth = self.params.dirt_depth;
        let mut heights = Vec::with_capacity(width);
        for x in 0..width {
            let surface = self.surface_height(x);
            heights.push(surface);
            for y in surface..height {
                let idx = y * width + x;
                let (block, wall) = if y + BOUNDARY_ROWS >= height {
                    (BlockId::Bedrock, WallId::Stone)
                } else if y == surface {
                    (BlockId::Grass, WallId::None)
                } else if y <= surface + dirt_depth {
                    (BlockId::Dirt, WallId::Dirt)
                } else {
                    (BlockId::Stone, WallId::Stone)
                };
                layers.blocks[idx] = block;
                layers.walls[idx] = wall;
            }
        }
        heights
    }

    fn cave_pass(&self, layers: &mut GeneratedLayers, heights: &[usize]) -> usize {
        let (width, height) = (layers.width, layers.height);
        let p = &self.params;
        let floor = height - BOUNDARY_ROWS;
        let mut carved = 0;
        for (x, &surface) in heights.iter().enumerate() {
            let start = (surface + p.cave_surface_margin).max(p.ground_level + p.cave_ground_margin);
            for y in start..floor {
                let n = self.noise.fbm(
                    x as f64 * p.cave_frequency + 1000.0,
                    y as f64 * p.cave_frequency + 1000.0,
                    2,
                );
                if n.abs() > p.cave_threshold {
                    let idx = y * width + x;
                    if layers.blocks[idx] != BlockId::Air {
                        layers.blocks[idx] = BlockId::Air;
                        carved += 1;
                    }
                }
            }
        }
        carved
    }

    fn ore_pass(&self, layers: &mut GeneratedLayers, heights: &[usize]) -> usize {
        let (width, height) = (layers.width, layers.height);
        let floor = height - BOUNDARY_ROWS;
        let mut placed = 0;
        for (x, &surface) in heights.iter().enumerate() {
            for y in surface..floor {
                let idx = y * width + x;
                if layers.blocks[idx] != BlockId::Stone {
                    continue;
                }
                let depth = y - surface;
                let mut chosen = None;
                for rule in &self.params.ores {
                    if rule.matches(&self.noise, x, y, depth) {
                        chosen = Some(rule.block);
                    }
                }
                if let Some(ore) = chosen {
                    layers.blocks[idx] = ore;
                    placed += 1;
                }
            }
        }
        placed
    }
}
