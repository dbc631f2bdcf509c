//! Trees and flowers on open grass.

use crate::grid::GeneratedLayers;
use crate::rng::Lcg;
use crate::tile::BlockId;

/// Vegetation tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// Chance an eligible grass column grows a tree.
    pub probability: f64,
    /// Shortest trunk.
    pub min_trunk: usize,
    /// Tallest trunk.
    pub max_trunk: usize,
    /// Chance a treeless grass column grows a flower.
    pub flower_probability: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            probability: 0.12,
            min_trunk: 4,
            max_trunk: 6,
            flower_probability: 0.1,
        }
    }
}

fn put_if_air(layers: &mut GeneratedLayers, x: i64, y: i64, block: BlockId) {
    if x < 0 || y < 0 || x as usize >= layers.width || y as usize >= layers.height {
        return;
    }
    let idx = y as usize * layers.width + x as usize;
    if layers.blocks[idx] == BlockId::Air {
        layers.blocks[idx] = block;
    }
}

/// Plant trees and flowers. Returns the number of trees.
pub(crate) fn plant_vegetation(
    layers: &mut GeneratedLayers,
    heights: &[usize],
    occupied: &[bool],
    rng: &mut Lcg,
    params: &TreeParams,
) -> usize {
    let width = layers.width;
    let mut last_tree: Option<usize> = None;
    let mut trees = 0;

    for x in 0..width {
        if occupied[x] {
            continue;
        }
        let surface = heights[x];
        if surface == 0 || layers.blocks[surface * width + x] != BlockId::Grass {
            continue;
        }
        let beside_tree = last_tree.is_some_and(|t| t + 1 == x);
        if !beside_tree && rng.chance(params.probability) {
            let span = (params.max_trunk - params.min_trunk + 1) as u32;
            let trunk = params.min_trunk + rng.below(span) as usize;
            let (xi, base) = (x as i64, surface as i64);
            for dy in 1..=trunk as i64 {
                put_if_air(layers, xi, base - dy, BlockId::Log);
            }
            let top = base - trunk as i64;
            for dx in -1..=1 {
                let column = xi + dx;
                // canopy stays out of structure footprints
                if column < 0 || occupied.get(column as usize).copied().unwrap_or(true) {
                    continue;
                }
                put_if_air(layers, column, top, BlockId::Leaves);
                put_if_air(layers, column, top - 1, BlockId::Leaves);
            }
            put_if_air(layers, xi, top - 2, BlockId::Leaves);
            last_tree = Some(x);
            trees += 1;
        } else if rng.chance(params.flower_probability) {
            put_if_air(layers, x as i64, surface as i64 - 1, BlockId::Flower);
        }
    }
    trees
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::WallId;

    fn meadow(width: usize, height: usize, surface: usize) -> GeneratedLayers {
        let mut blocks = vec![BlockId::Air; width * height];
        for x in 0..width {
            blocks[surface * width + x] = BlockId::Grass;
        }
        GeneratedLayers {
            width,
            height,
            blocks,
            walls: vec![WallId::None; width * height],
        }
    }

    #[test]
    fn trees_are_never_adjacent() {
        let mut layers = meadow(64, 30, 20);
        let heights = vec![20; 64];
        let params = TreeParams {
            probability: 1.0,
            ..TreeParams::default()
        };
        let trees = plant_vegetation(&mut layers, &heights, &[false; 64], &mut Lcg::new(1), &params);
        assert_eq!(trees, 32);
        for x in 0..63 {
            let here = layers.blocks[19 * 64 + x] == BlockId::Log;
            let next = layers.blocks[19 * 64 + x + 1] == BlockId::Log;
            assert!(!(here && next), "adjacent trunks at {x}");
        }
    }

    #[test]
    fn occupied_columns_stay_bare() {
        let mut layers = meadow(16, 30, 20);
        let heights = vec![20; 16];
        let occupied = [true; 16];
        let params = TreeParams {
            probability: 1.0,
            flower_probability: 1.0,
            ..TreeParams::default()
        };
        let trees = plant_vegetation(&mut layers, &heights, &occupied, &mut Lcg::new(1), &params);
        assert_eq!(trees, 0);
        assert!(layers.blocks[..20 * 16].iter().all(|&b| b == BlockId::Air));
    }

    #[test]
    fn canopy_skips_structure_columns() {
        let mut layers = meadow(16, 30, 20);
        let heights = vec![20; 16];
        let mut occupied = [true; 16];
        occupied[5] = false;
        let params = TreeParams {
            probability: 1.0,
            flower_probability: 0.0,
            ..TreeParams::default()
        };
        let trees = plant_vegetation(&mut layers, &heights, &occupied, &mut Lcg::new(3), &params);
        assert_eq!(trees, 1);
        for y in 0..20 {
            for x in [4, 6] {
                assert_eq!(layers.blocks[y * 16 + x], BlockId::Air, "leaf at ({x}, {y})");
            }
        }
        assert!((0..20).any(|y| layers.blocks[y * 16 + 5] == BlockId::Leaves));
    }
}

