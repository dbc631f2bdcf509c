//! The mutable tile grid: block, wall and light layers plus the change log.
//!
//! Layers are dense row-major vectors indexed `y * width + x`, with row 0 at
//! the top of the world. All coordinate-taking methods accept signed values
//! and silently ignore anything outside the grid, because coordinates arrive
//! from physics (which can probe past the edges) and from remote peers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorldError;
use crate::tile::{BlockId, WallId};

/// Number of indestructible rows at the bottom of every world.
pub const BOUNDARY_ROWS: usize = 3;

/// Change-log length below which automatic compaction never runs.
const COMPACT_FLOOR: usize = 4096;

/// Recorded foreground mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChange {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Value written.
    pub block: BlockId,
}

/// Recorded background mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallChange {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Value written.
    pub wall: WallId,
}

/// Record of the mutations applied since the world was generated.
///
/// Replayed in order onto a freshly generated world with the same seed, it
/// reproduces the recording world's layers exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    /// Block mutations in application order.
    pub blocks: Vec<BlockChange>,
    /// Wall mutations in application order.
    pub walls: Vec<WallChange>,
}

impl ChangeLog {
    /// Total number of recorded mutations.
    pub fn len(&self) -> usize {
        self.blocks.len() + self.walls.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.walls.is_empty()
    }

    /// Keep only the last write to each cell, in the order those writes happened.
    ///
    /// Replaying the compacted log produces the same layers as the full one.
    pub fn compact(&mut self) {
        self.blocks = last_write_per_cell(&self.blocks, |c| (c.x, c.y));
        self.walls = last_write_per_cell(&self.walls, |c| (c.x, c.y));
    }
}

fn last_write_per_cell<T: Copy>(changes: &[T], cell: impl Fn(&T) -> (u32, u32)) -> Vec<T> {
    let mut seen = BTreeSet::new();
    let mut kept: Vec<T> = changes
        .iter()
        .rev()
        .filter(|change| seen.insert(cell(change)))
        .copied()
        .collect();
    kept.reverse();
    kept
}

/// Tiles and columns touched since the last [`TileWorld::take_dirty`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyRegion {
    /// Individual mutated tiles, in mutation order (may repeat).
    pub tiles: Vec<(usize, usize)>,
    /// Inclusive column span covering every mutation.
    pub columns: Option<(usize, usize)>,
}

impl DirtyRegion {
    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.columns.is_none()
    }

    fn touch_column(&mut self, x: usize) {
        self.columns = Some(match self.columns {
            Some((lo, hi)) => (lo.min(x), hi.max(x)),
            None => (x, x),
        });
    }
}

/// Layers produced by world generation.
#[derive(Debug, Clone)]
pub(crate) struct GeneratedLayers {
    pub width: usize,
    pub height: usize,
    pub blocks: Vec<BlockId>,
    pub walls: Vec<WallId>,
}

/// Mutable world grid owned by one peer's simulation.
#[derive(Debug, Clone)]
pub struct TileWorld {
    width: usize,
    height: usize,
    seed: u32,
    blocks: Vec<BlockId>,
    walls: Vec<WallId>,
    pub(crate) light: Vec<f32>,
    /// First movement-blocking row per column (`height` when the column is open).
    surface: Vec<usize>,
    change_log: ChangeLog,
    /// Log length that triggers the next compaction.
    compact_at: usize,
    dirty: DirtyRegion,
}

impl TileWorld {
    pub(crate) fn from_generated(seed: u32, layers: GeneratedLayers) -> Self {
        let GeneratedLayers {
            width,
            height,
            blocks,
            walls,
        } = layers;
        let mut world = Self {
            width,
            height,
            seed,
            blocks,
            walls,
            light: vec![0.0; width * height],
            surface: vec![height; width],
            change_log: ChangeLog::default(),
            compact_at: COMPACT_FLOOR * 2,
            dirty: DirtyRegion::default(),
        };
        for x in 0..width {
            world.refresh_surface(x);
        }
        world
    }

    /// Rebuild a world from raw persisted layers.
    ///
    /// The change log starts empty (see [`TileWorld::rebuild_change_log`]);
    /// light is zero until the lighting engine runs.
    pub fn from_layers(
        width: usize,
        height: usize,
        seed: u32,
        blocks: &[u8],
        walls: &[u8],
    ) -> Result<Self, WorldError> {
        let expected = width * height;
        for actual in [blocks.len(), walls.len()] {
            if actual != expected {
                return Err(WorldError::LayerSizeMismatch { expected, actual });
            }
        }
        let blocks = blocks
            .iter()
            .map(|&raw| BlockId::try_from(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let walls = walls
            .iter()
            .map(|&raw| WallId::try_from(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_generated(
            seed,
            GeneratedLayers {
                width,
                height,
                blocks,
                walls,
            },
        ))
    }

    /// Width in tiles.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in tiles.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Seed the world was generated from.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Convert signed coordinates into a layer index when inside the grid.
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Whether `(x, y)` lies in the indestructible bottom band.
    #[inline]
    pub fn is_boundary_row(&self, y: i32) -> bool {
        y >= 0 && (y as usize) + BOUNDARY_ROWS >= self.height && (y as usize) < self.height
    }

    /// Block at a tile, `None` outside the grid.
    #[inline]
    pub fn block(&self, x: i32, y: i32) -> Option<BlockId> {
        self.index(x, y).map(|i| self.blocks[i])
    }

    /// Wall at a tile, `None` outside the grid.
    #[inline]
    pub fn wall(&self, x: i32, y: i32) -> Option<WallId> {
        self.index(x, y).map(|i| self.walls[i])
    }

    /// Light at a tile, zero outside the grid.
    #[inline]
    pub fn light(&self, x: i32, y: i32) -> f32 {
        self.index(x, y).map_or(0.0, |i| self.light[i])
    }

    /// First movement-blocking row in column `x`.
    pub fn surface_row(&self, x: i32) -> Option<usize> {
        if x < 0 {
            return None;
        }
        self.surface
            .get(x as usize)
            .copied()
            .filter(|&row| row < self.height)
    }

    /// Foreground layer.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    /// Background layer.
    pub fn walls(&self) -> &[WallId] {
        &self.walls
    }

    /// Light layer.
    pub fn light_layer(&self) -> &[f32] {
        &self.light
    }

    /// Foreground layer as raw bytes.
    pub fn block_bytes(&self) -> Vec<u8> {
        self.blocks.iter().map(|b| b.to_u8()).collect()
    }

    /// Background layer as raw bytes.
    pub fn wall_bytes(&self) -> Vec<u8> {
        self.walls.iter().map(|w| w.to_u8()).collect()
    }

    /// Mutations applied since creation, compacted to the last write per cell
    /// once it grows past twice its previous compacted length.
    pub fn change_log(&self) -> &ChangeLog {
        &self.change_log
    }

    /// Write a block. Returns true when the stored value changed.
    ///
    /// Out-of-range coordinates and writes into the boundary band are ignored.
    /// Writing the value already present is a no-op and is not logged.
    pub fn set_block(&mut self, x: i32, y: i32, block: BlockId) -> bool {
        let Some(idx) = self.index(x, y) else {
            debug!(x, y, "ignoring out-of-range block write");
            return false;
        };
        if self.is_boundary_row(y) || self.blocks[idx] == block {
            return false;
        }
        self.blocks[idx] = block;
        let (ux, uy) = (x as usize, y as usize);
        self.change_log.blocks.push(BlockChange {
            x: ux as u32,
            y: uy as u32,
            block,
        });
        self.maybe_compact();
        self.refresh_surface(ux);
        self.mark_dirty(ux, uy);
        true
    }

    /// Write a wall. Returns true when the stored value changed.
    pub fn set_wall(&mut self, x: i32, y: i32, wall: WallId) -> bool {
        let Some(idx) = self.index(x, y) else {
            debug!(x, y, "ignoring out-of-range wall write");
            return false;
        };
        if self.walls[idx] == wall {
            return false;
        }
        self.walls[idx] = wall;
        let (ux, uy) = (x as usize, y as usize);
        self.change_log.walls.push(WallChange {
            x: ux as u32,
            y: uy as u32,
            wall,
        });
        self.maybe_compact();
        self.mark_dirty(ux, uy);
        true
    }

    /// Apply a recorded change log in order. Returns the number of cells that changed.
    pub fn replay(&mut self, log: &ChangeLog) -> usize {
        let mut applied = 0;
        for change in &log.blocks {
            if self.set_block(change.x as i32, change.y as i32, change.block) {
                applied += 1;
            }
        }
        for change in &log.walls {
            if self.set_wall(change.x as i32, change.y as i32, change.wall) {
                applied += 1;
            }
        }
        applied
    }

    /// Replace the change log with the cells that differ from `generated`.
    ///
    /// Used when a world is rebuilt from raw layers: replaying the result onto
    /// a fresh world from the same seed reproduces this one. Returns the
    /// number of recorded changes.
    pub fn rebuild_change_log(&mut self, generated: &TileWorld) -> Result<usize, WorldError> {
        if (generated.width, generated.height) != (self.width, self.height) {
            return Err(WorldError::DimensionMismatch {
                expected: (self.width, self.height),
                actual: (generated.width, generated.height),
            });
        }
        let mut log = ChangeLog::default();
        for (idx, (&block, &wall)) in self.blocks.iter().zip(&self.walls).enumerate() {
            let (x, y) = ((idx % self.width) as u32, (idx / self.width) as u32);
            if block != generated.blocks[idx] {
                log.blocks.push(BlockChange { x, y, block });
            }
            if wall != generated.walls[idx] {
                log.walls.push(WallChange { x, y, wall });
            }
        }
        let recorded = log.len();
        self.change_log = log;
        self.compact_at = self.change_log.len().max(COMPACT_FLOOR) * 2;
        Ok(recorded)
    }

    /// Flag an inclusive column span for lighting and cache refresh.
    pub fn mark_columns_dirty(&mut self, min_x: usize, max_x: usize) {
        if self.width == 0 {
            return;
        }
        let hi = max_x.min(self.width - 1);
        let lo = min_x.min(hi);
        self.dirty.touch_column(lo);
        self.dirty.touch_column(hi);
    }

    /// Drain the dirty region accumulated since the last call.
    pub fn take_dirty(&mut self) -> DirtyRegion {
        std::mem::take(&mut self.dirty)
    }

    /// Peek at the pending dirty region.
    pub fn dirty(&self) -> &DirtyRegion {
        &self.dirty
    }

    fn maybe_compact(&mut self) {
        if self.change_log.len() <= self.compact_at {
            return;
        }
        let before = self.change_log.len();
        self.change_log.compact();
        self.compact_at = self.change_log.len().max(COMPACT_FLOOR) * 2;
        debug!(before, after = self.change_log.len(), "compacted change log");
    }

    fn mark_dirty(&mut self, x: usize, y: usize) {
        self.dirty.tiles.push((x, y));
        self.dirty.touch_column(x);
    }

    fn refresh_surface(&mut self, x: usize) {
        let width = self.width;
        self.surface[x] = (0..self.height)
            .find(|&y| self.blocks[y * width + x].blocks_movement())
            .unwrap_or(self.height);
    }
}
