use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use tileforge_world::{DirtyRegion, TileWorld};
use tracing::{debug, trace};

use crate::artist::{TileArtist, TileSample};
use crate::viewport::Viewport;

/// Chunk geometry and margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Tiles per chunk side.
    pub chunk_tiles: u32,
    /// Pixels per tile side.
    pub tile_px: u32,
    /// Chunks around the viewport kept rendered.
    pub load_margin: u32,
    /// Chunks around the viewport blitted each frame.
    pub draw_margin: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            chunk_tiles: 16,
            tile_px: 8,
            load_margin: 1,
            draw_margin: 0,
        }
    }
}

impl CacheConfig {
    /// Pixels per chunk side.
    pub fn chunk_px(&self) -> u32 {
        self.chunk_tiles * self.tile_px
    }
}

#[derive(Debug, Clone, Default)]
struct ChunkEntry {
    image: Option<RgbaImage>,
    rendered: bool,
    dirty: bool,
    is_empty: bool,
}

/// Counters from one update pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Chunks re-rendered this pass.
    pub rendered: usize,
    /// Of those, chunks found fully transparent.
    pub empty: usize,
}

/// Cached chunk images indexed `cy * cols + cx`.
///
/// A chunk's image matches the world's block, wall and light layers as of
/// the last pass that found it dirty; mutations between passes are picked up
/// on the next [`ChunkRenderCache::update`].
#[derive(Debug, Clone)]
pub struct ChunkRenderCache {
    config: CacheConfig,
    cols: usize,
    rows: usize,
    world_w: usize,
    world_h: usize,
    entries: Vec<ChunkEntry>,
}

impl ChunkRenderCache {
    /// Empty cache for a `world_w x world_h` tile grid.
    pub fn new(config: CacheConfig, world_w: usize, world_h: usize) -> Self {
        let side = config.chunk_tiles.max(1) as usize;
        let cols = world_w.div_ceil(side);
        let rows = world_h.div_ceil(side);
        Self {
            config,
            cols,
            rows,
            world_w,
            world_h,
            entries: vec![ChunkEntry::default(); cols * rows],
        }
    }

    /// Geometry in use.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Chunk grid size `(cols, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    fn side(&self) -> usize {
        self.config.chunk_tiles.max(1) as usize
    }

    fn index(&self, cx: usize, cy: usize) -> Option<usize> {
        (cx < self.cols && cy < self.rows).then(|| cy * self.cols + cx)
    }

    /// Flag the chunk owning tile `(x, y)`.
    pub fn mark_dirty(&mut self, x: usize, y: usize) {
        let side = self.side();
        if let Some(idx) = self.index(x / side, y / side) {
            self.entries[idx].dirty = true;
        }
    }

    /// Flag every chunk in the inclusive tile-column span, across the full height.
    pub fn mark_dirty_range(&mut self, min_x: usize, max_x: usize) {
        if self.cols == 0 {
            return;
        }
        let side = self.side();
        let c0 = (min_x.min(max_x) / side).min(self.cols - 1);
        let c1 = (min_x.max(max_x) / side).min(self.cols - 1);
        for cy in 0..self.rows {
            for cx in c0..=c1 {
                let idx = cy * self.cols + cx;
                self.entries[idx].dirty = true;
            }
        }
        trace!(c0, c1, "chunk columns marked dirty");
    }

    /// Flag every chunk, e.g. after the world was replaced.
    pub fn mark_all_dirty(&mut self) {
        for entry in &mut self.entries {
            entry.dirty = true;
        }
    }

    /// Flag the chunks owning each mutated tile of a drained [`DirtyRegion`].
    ///
    /// The column span is left to the caller, which widens it by whatever the
    /// lighting pass rewrote before calling [`Self::mark_dirty_range`].
    pub fn apply_dirty(&mut self, region: &DirtyRegion) {
        for &(x, y) in &region.tiles {
            self.mark_dirty(x, y);
        }
    }

    /// Whether chunk `(cx, cy)` has been rendered at least once.
    pub fn is_cached(&self, cx: usize, cy: usize) -> bool {
        self.index(cx, cy)
            .is_some_and(|idx| self.entries[idx].rendered)
    }

    /// Whether chunk `(cx, cy)` is waiting for a re-render.
    pub fn is_dirty(&self, cx: usize, cy: usize) -> bool {
        self.index(cx, cy).is_some_and(|idx| self.entries[idx].dirty)
    }

    /// Whether chunk `(cx, cy)` rendered fully transparent.
    pub fn is_empty(&self, cx: usize, cy: usize) -> bool {
        self.index(cx, cy)
            .is_some_and(|idx| self.entries[idx].is_empty)
    }

    /// Re-render dirty or never-rendered chunks within the load margin of `view`.
    pub fn update(&mut self, world: &TileWorld, view: &Viewport, artist: &dyn TileArtist) -> CacheStats {
        let mut stats = CacheStats::default();
        let Some(((x0, x1), (y0, y1))) =
            view.chunk_span(self.config.chunk_px(), self.config.load_margin, self.cols, self.rows)
        else {
            return stats;
        };
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                let idx = cy * self.cols + cx;
                let entry = &self.entries[idx];
                if entry.rendered && !entry.dirty {
                    continue;
                }
                let (image, is_empty) = self.render_chunk(world, cx, cy, artist);
                let entry = &mut self.entries[idx];
                entry.image = image;
                entry.is_empty = is_empty;
                entry.rendered = true;
                entry.dirty = false;
                stats.rendered += 1;
                if is_empty {
                    stats.empty += 1;
                }
            }
        }
        if stats.rendered > 0 {
            debug!(rendered = stats.rendered, empty = stats.empty, "chunk cache updated");
        }
        stats
    }

    fn render_chunk(
        &self,
        world: &TileWorld,
        cx: usize,
        cy: usize,
        artist: &dyn TileArtist,
    ) -> (Option<RgbaImage>, bool) {
        let side = self.side();
        let tile_px = self.config.tile_px;
        let mut image: Option<RgbaImage> = None;
        for ty in 0..side {
            let y = cy * side + ty;
            if y >= self.world_h {
                break;
            }
            for tx in 0..side {
                let x = cx * side + tx;
                if x >= self.world_w {
                    break;
                }
                let (xi, yi) = (x as i32, y as i32);
                let tile = TileSample {
                    block: world.block(xi, yi).unwrap_or_default(),
                    wall: world.wall(xi, yi).unwrap_or_default(),
                    light: world.light(xi, yi),
                };
                if tile.is_transparent() {
                    continue;
                }
                let canvas = image.get_or_insert_with(|| {
                    let px = self.config.chunk_px();
                    RgbaImage::new(px, px)
                });
                artist.draw_tile(canvas, tx as u32 * tile_px, ty as u32 * tile_px, tile_px, tile);
            }
        }
        let is_empty = image.is_none();
        (image, is_empty)
    }

    /// Blit cached chunks within the draw margin of `view` onto `canvas`.
    ///
    /// Returns the number of chunk images drawn.
    pub fn draw(&self, view: &Viewport, canvas: &mut RgbaImage) -> usize {
        let chunk_px = self.config.chunk_px();
        let Some(((x0, x1), (y0, y1))) =
            view.chunk_span(chunk_px, self.config.draw_margin, self.cols, self.rows)
        else {
            return 0;
        };
        let mut drawn = 0;
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                let entry = &self.entries[cy * self.cols + cx];
                let Some(image) = entry.image.as_ref() else {
                    continue;
                };
                let x = cx as i64 * i64::from(chunk_px) - view.left;
                let y = cy as i64 * i64::from(chunk_px) - view.top;
                imageops::overlay(canvas, image, x, y);
                drawn += 1;
            }
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artist::FlatColorArtist;
    use tileforge_world::{BlockId, WallId};

    fn flat_world(w: usize, h: usize, ground: usize) -> TileWorld {
        let mut blocks = vec![BlockId::Air.to_u8(); w * h];
        for y in ground..h {
            for x in 0..w {
                blocks[y * w + x] = BlockId::Stone.to_u8();
            }
        }
        TileWorld::from_layers(w, h, 1, &blocks, &vec![0; w * h]).unwrap()
    }

    #[test]
    fn only_dirty_chunks_rerender() {
        let mut world = flat_world(64, 64, 40);
        let mut cache = ChunkRenderCache::new(CacheConfig::default(), 64, 64);
        let view = Viewport::whole_world(64, 64, 8);
        let artist = FlatColorArtist;

        let first = cache.update(&world, &view, &artist);
        assert_eq!(first.rendered, 16);
        assert_eq!(cache.update(&world, &view, &artist).rendered, 0);

        world.set_block(5, 5, BlockId::Planks);
        cache.apply_dirty(&world.take_dirty());
        assert!(cache.is_dirty(0, 0));
        assert_eq!(cache.update(&world, &view, &artist).rendered, 1);
        assert!(!cache.is_empty(0, 0));
    }

    #[test]
    fn sky_chunks_are_empty() {
        let world = flat_world(32, 64, 40);
        let mut cache = ChunkRenderCache::new(CacheConfig::default(), 32, 64);
        let view = Viewport::whole_world(32, 64, 8);
        let stats = cache.update(&world, &view, &FlatColorArtist);
        assert_eq!(stats.rendered, 8);
        // rows 0 and 1 of chunks are above the ground at tile 40
        assert_eq!(stats.empty, 4);
        assert!(cache.is_empty(1, 1));
        assert!(!cache.is_empty(0, 2));
    }

    #[test]
    fn range_marks_whole_columns() {
        let mut cache = ChunkRenderCache::new(CacheConfig::default(), 64, 48);
        cache.mark_dirty_range(17, 33);
        for cy in 0..3 {
            assert!(!cache.is_dirty(0, cy));
            assert!(cache.is_dirty(1, cy));
            assert!(cache.is_dirty(2, cy));
            assert!(!cache.is_dirty(3, cy));
        }
    }

    #[test]
    fn load_margin_bounds_rendering() {
        let world = flat_world(160, 32, 8);
        let mut cache = ChunkRenderCache::new(CacheConfig::default(), 160, 32);
        let view = Viewport {
            left: 0,
            top: 0,
            width: 128,
            height: 256,
        };
        cache.update(&world, &view, &FlatColorArtist);
        assert!(cache.is_cached(0, 0));
        assert!(cache.is_cached(1, 1));
        assert!(!cache.is_cached(2, 0));
    }

    #[test]
    fn draw_blits_only_visible_chunks() {
        let mut world = flat_world(64, 32, 0);
        world.set_wall(0, 0, WallId::Brick);
        let mut cache = ChunkRenderCache::new(CacheConfig::default(), 64, 32);
        let view = Viewport::whole_world(64, 32, 8);
        cache.update(&world, &view, &FlatColorArtist);

        let small = Viewport {
            left: 0,
            top: 0,
            width: 128,
            height: 128,
        };
        let mut canvas = RgbaImage::new(128, 128);
        assert_eq!(cache.draw(&small, &mut canvas), 1);
        assert_eq!(canvas.get_pixel(0, 0)[3], 255);
    }
}
