//! Column skylight attenuation with horizontal smoothing.
//!
//! Light enters every column at 1.0 from row 0 and is attenuated by each
//! opaque block (and, more gently, by bare walls) on the way down. Once it
//! drops below `epsilon` the rest of the column is dark. Two relaxation
//! passes then bleed light sideways so shadow edges are soft.

use std::ops::RangeInclusive;

use tracing::{instrument, trace};

use crate::grid::TileWorld;

/// Lighting tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingConfig {
    /// Multiplier applied below each opaque block.
    pub opaque_factor: f32,
    /// Multiplier applied below each wall with no block in front.
    pub wall_factor: f32,
    /// Light below this is clamped to zero for the rest of the column.
    pub epsilon: f32,
    /// Fraction of the brighter neighbour a cell is raised to.
    pub smoothing: f32,
    /// Relaxation passes per recompute.
    pub passes: usize,
    /// Extra columns recomputed on each side of a dirty range.
    pub margin: usize,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            opaque_factor: 0.55,
            wall_factor: 0.85,
            epsilon: 0.01,
            smoothing: 0.75,
            passes: 2,
            margin: 2,
        }
    }
}

/// Recomputes the light layer of a [`TileWorld`].
#[derive(Debug, Clone, Default)]
pub struct LightingEngine {
    config: LightingConfig,
}

impl LightingEngine {
    /// Engine with explicit tunables.
    pub fn new(config: LightingConfig) -> Self {
        Self { config }
    }

    /// Active tunables.
    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    /// Recompute every column.
    #[instrument(skip_all, fields(width = world.width()))]
    pub fn recompute_all(&self, world: &mut TileWorld) {
        if world.width() == 0 {
            return;
        }
        self.recompute_columns(world, 0, world.width() - 1, true);
    }

    /// Recompute an inclusive dirty column span, widened by the margin.
    ///
    /// A smoothed recompute always matches [`LightingEngine::recompute_all`]:
    /// the written span reaches at least one column per relaxation pass past
    /// the dirty columns, and the passes read unsmoothed light from a wider
    /// window. Returns the columns actually rewritten.
    pub fn recompute(
        &self,
        world: &mut TileWorld,
        min_x: usize,
        max_x: usize,
        smooth: bool,
    ) -> Option<RangeInclusive<usize>> {
        let width = world.width();
        if width == 0 || min_x >= width {
            return None;
        }
        let reach = if smooth {
            self.config.margin.max(self.config.passes)
        } else {
            self.config.margin
        };
        let lo = min_x.saturating_sub(reach);
        let hi = (max_x.max(min_x) + reach).min(width - 1);
        self.recompute_columns(world, lo, hi, smooth);
        Some(lo..=hi)
    }

    /// Rewrite light in `lo..=hi`.
    ///
    /// Each smoothing pass moves information one column, so the window is
    /// widened by `passes` on both sides; the widened edges are scratch and
    /// never written back.
    fn recompute_columns(&self, world: &mut TileWorld, lo: usize, hi: usize, smooth: bool) {
        let (width, height) = (world.width(), world.height());
        let passes = if smooth { self.config.passes } else { 0 };
        let win_lo = lo.saturating_sub(passes);
        let win_hi = (hi + passes).min(width - 1);
        let span = win_hi - win_lo + 1;

        let mut light = vec![0.0f32; span * height];
        for x in win_lo..=win_hi {
            self.attenuate_column(world, x, &mut light, x - win_lo, span);
        }
        for _ in 0..passes {
            light = self.smooth_pass(&light, span, height, win_lo, width);
        }
        for y in 0..height {
            let row = y * width;
            let local = y * span;
            world.light[row + lo..=row + hi]
                .copy_from_slice(&light[local + lo - win_lo..=local + hi - win_lo]);
        }
        trace!(lo, hi, smooth, "recomputed light");
    }

    fn attenuate_column(&self, world: &TileWorld, x: usize, light: &mut [f32], col: usize, span: usize) {
        let (width, height) = (world.width(), world.height());
        let mut level = 1.0f32;
        for y in 0..height {
            if level < self.config.epsilon {
                // rest of the column stays at zero
                break;
            }
            light[y * span + col] = level;
            let idx = y * width + x;
            let block = world.blocks()[idx];
            if block.is_opaque() {
                level *= self.config.opaque_factor;
            } else if !block.is_solid() && world.walls()[idx].is_present() {
                level *= self.config.wall_factor;
            }
        }
    }

    /// One Jacobi relaxation pass over a window starting at world column
    /// `win_lo`. Every cell reads the previous pass only. The world's edge
    /// columns, and window edges with no neighbour inside, are copied.
    fn smooth_pass(&self, prev: &[f32], span: usize, height: usize, win_lo: usize, width: usize) -> Vec<f32> {
        let mut next = prev.to_vec();
        for y in 0..height {
            let row = y * span;
            for col in 1..span.saturating_sub(1) {
                let x = win_lo + col;
                if x == 0 || x + 1 >= width {
                    continue;
                }
                let neighbour = prev[row + col - 1].max(prev[row + col + 1]);
                let raised = neighbour * self.config.smoothing;
                if raised > prev[row + col] {
                    next[row + col] = raised;
                }
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BOUNDARY_ROWS;
    use crate::tile::{BlockId, WallId};

    fn pillar_world() -> TileWorld {
        let (w, h) = (5, 12);
        let mut blocks = vec![BlockId::Air.to_u8(); w * h];
        let walls = vec![WallId::None.to_u8(); w * h];
        for y in 0..h {
            blocks[y * w + 2] = BlockId::Stone.to_u8();
        }
        for y in h - BOUNDARY_ROWS..h {
            for x in 0..w {
                blocks[y * w + x] = BlockId::Bedrock.to_u8();
            }
        }
        TileWorld::from_layers(w, h, 0, &blocks, &walls).unwrap()
    }

    #[test]
    fn solid_column_darkens_then_zeroes() {
        let mut world = pillar_world();
        let engine = LightingEngine::default();
        engine.recompute(&mut world, 2, 2, false);
        assert_eq!(world.light(2, 0), 1.0);
        assert!((world.light(2, 1) - 0.55).abs() < 1e-6);
        // 0.55^8 is below epsilon.
        assert_eq!(world.light(2, 9), 0.0);
        assert_eq!(world.light(2, 11), 0.0);
    }

    #[test]
    fn smoothing_lifts_shadowed_neighbours() {
        let mut world = pillar_world();
        let engine = LightingEngine::default();
        engine.recompute_all(&mut world);
        // Column 2 sits between two open columns, so it is lifted to 75% of them.
        assert!((world.light(2, 5) - 0.75).abs() < 1e-6);
        for x in 0..5 {
            for y in 1..12 {
                assert!(world.light(x, y) <= world.light(x, y - 1) + 1e-6);
            }
        }
    }

    #[test]
    fn bare_wall_attenuates_gently() {
        let (w, h) = (3, 6);
        let blocks = vec![0u8; w * h];
        let mut walls = vec![0u8; w * h];
        walls[w + 1] = WallId::Stone.to_u8();
        let mut world = TileWorld::from_layers(w, h, 0, &blocks, &walls).unwrap();
        LightingEngine::default().recompute(&mut world, 1, 1, false);
        assert_eq!(world.light(1, 1), 1.0);
        assert!((world.light(1, 2) - 0.85).abs() < 1e-6);
    }

    #[test]
    fn range_is_clamped_to_world() {
        let mut world = pillar_world();
        let engine = LightingEngine::default();
        assert_eq!(engine.recompute(&mut world, 0, 100, true), Some(0..=4));
        assert_eq!(engine.recompute(&mut world, 3, 3, true), Some(1..=4));
        assert_eq!(engine.recompute(&mut world, 9, 9, true), None);
    }

    #[test]
    fn closing_a_skylight_relights_like_a_full_pass() {
        let (w, h) = (40, 20);
        let mut blocks = vec![BlockId::Air.to_u8(); w * h];
        let walls = vec![WallId::None.to_u8(); w * h];
        for x in 0..w {
            if x != 20 {
                blocks[3 * w + x] = BlockId::Stone.to_u8();
            }
        }
        let mut world = TileWorld::from_layers(w, h, 0, &blocks, &walls).unwrap();
        let engine = LightingEngine::default();
        engine.recompute_all(&mut world);

        world.set_block(20, 3, BlockId::Stone);
        let (lo, hi) = world.take_dirty().columns.unwrap();
        engine.recompute(&mut world, lo, hi, true);

        let mut full = world.clone();
        engine.recompute_all(&mut full);
        assert_eq!(world.light_layer(), full.light_layer());
    }
}

