//! Surface structures stamped from ASCII templates.
//!
//! Template rows run top to bottom; the last row is the floor and lands on
//! the lowest surface row under the footprint. Palette:
//!
//! | byte | block | wall |
//! |---|---|---|
//! | `B` | brick | untouched |
//! | `P` | planks | untouched |
//! | `G` | glass | planks |
//! | `b` | air | brick |
//! | `p` | air | planks |
//! | `.` | air | untouched |
//! | ` ` | untouched | untouched |

use tracing::debug;

use crate::grid::GeneratedLayers;
use crate::rng::Lcg;
use crate::tile::{BlockId, WallId};

/// Structure placement tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureParams {
    /// Columns examined for flatness.
    pub window: usize,
    /// Maximum surface height difference inside the window.
    pub max_variance: usize,
    /// Chance a flat, spaced candidate gets a structure.
    pub probability: f64,
    /// Minimum columns between the end of one structure and the start of the next.
    pub min_spacing: usize,
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            window: 5,
            max_variance: 1,
            probability: 0.04,
            min_spacing: 24,
        }
    }
}

/// Available templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    /// Small house with a door and a window.
    Dwelling,
    /// Tall brick tower.
    Watchtower,
    /// Broken brick walls.
    Ruins,
}

const DWELLING: &[&str] = &[
    " PPPPP ",
    "PPPPPPP",
    "BppGppB",
    "Bppppp.",
    "Bppppp.",
    "BBBBBBB",
];

const WATCHTOWER: &[&str] = &[
    "B B B",
    "BBBBB",
    "BbbbB",
    "BbGbB",
    "BbbbB",
    "PPP.P",
    "Bbbb.",
    "Bbbb.",
    "BBBBB",
];

const RUINS: &[&str] = &[
    "B     B ",
    "B   B B ",
    "Bbb bBbB",
    "BBB BBBB",
];

impl StructureKind {
    /// Every template, in selection order.
    pub const ALL: [StructureKind; 3] = [
        StructureKind::Dwelling,
        StructureKind::Watchtower,
        StructureKind::Ruins,
    ];

    /// ASCII rows, top to bottom.
    pub fn template(self) -> &'static [&'static str] {
        match self {
            StructureKind::Dwelling => DWELLING,
            StructureKind::Watchtower => WATCHTOWER,
            StructureKind::Ruins => RUINS,
        }
    }

    /// Footprint width in columns.
    pub fn width(self) -> usize {
        self.template().first().map_or(0, |row| row.len())
    }
}

/// A stamped structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedStructure {
    /// Template used.
    pub kind: StructureKind,
    /// Leftmost column.
    pub x: usize,
    /// Row of the floor.
    pub floor_y: usize,
}

fn palette(byte: u8) -> (Option<BlockId>, Option<WallId>) {
    match byte {
        b'B' => (Some(BlockId::Brick), None),
        b'P' => (Some(BlockId::Planks), None),
        b'G' => (Some(BlockId::Glass), Some(WallId::Planks)),
        b'b' => (Some(BlockId::Air), Some(WallId::Brick)),
        b'p' => (Some(BlockId::Air), Some(WallId::Planks)),
        b'.' => (Some(BlockId::Air), None),
        _ => (None, None),
    }
}

fn stamp(layers: &mut GeneratedLayers, kind: StructureKind, x0: usize, floor_y: usize) {
    let rows = kind.template();
    let top = floor_y as i64 - (rows.len() as i64 - 1);
    for (dy, row) in rows.iter().enumerate() {
        let y = top + dy as i64;
        if y < 0 || y as usize >= layers.height {
            continue;
        }
        for (dx, byte) in row.bytes().enumerate() {
            let x = x0 + dx;
            if x >= layers.width {
                continue;
            }
            let idx = y as usize * layers.width + x;
            let (block, wall) = palette(byte);
            if let Some(block) = block {
                layers.blocks[idx] = block;
            }
            if let Some(wall) = wall {
                layers.walls[idx] = wall;
            }
        }
    }
}

/// Scan the surface left to right and stamp structures on flat runs.
///
/// Marks every footprint column in `occupied` so vegetation skips it.
pub(crate) fn place_structures(
    layers: &mut GeneratedLayers,
    heights: &[usize],
    occupied: &mut [bool],
    rng: &mut Lcg,
    params: &StructureParams,
) -> Vec<PlacedStructure> {
    let width = layers.width;
    let mut placed = Vec::new();
    let mut next_allowed = 1usize;
    let mut x = 1usize;

    while x + params.window < width {
        if x < next_allowed || !is_flat(&heights[x..x + params.window], params.max_variance) {
            x += 1;
            continue;
        }
        if !rng.chance(params.probability) {
            x += 1;
            continue;
        }
        let kind = StructureKind::ALL[rng.below(StructureKind::ALL.len() as u32) as usize];
        let w = kind.width();
        if x + w >= width || !is_flat(&heights[x..x + w], params.max_variance) {
            x += 1;
            continue;
        }
        let floor_y = heights[x..x + w].iter().copied().max().unwrap_or(heights[x]);
        stamp(layers, kind, x, floor_y);
        for slot in &mut occupied[x..x + w] {
            *slot = true;
        }
        debug!(?kind, x, floor_y, "placed structure");
        placed.push(PlacedStructure { kind, x, floor_y });
        next_allowed = x + w + params.min_spacing;
        x += w;
    }
    placed
}

fn is_flat(heights: &[usize], max_variance: usize) -> bool {
    match (heights.iter().min(), heights.iter().max()) {
        (Some(lo), Some(hi)) => hi - lo <= max_variance,
        _ => false,
    }
}
