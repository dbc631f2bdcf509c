//! Render collaborator traits and the flat-colour reference artist.

use glam::Vec2;
use image::{Rgba, RgbaImage};
use tileforge_sim::{EntityKind, Facing};
use tileforge_world::{BlockId, WallId};

/// Everything needed to draw one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSample {
    /// Foreground block.
    pub block: BlockId,
    /// Background wall.
    pub wall: WallId,
    /// Light level in `[0, 1]`.
    pub light: f32,
}

impl TileSample {
    /// Nothing to draw: no block and no wall.
    pub fn is_transparent(&self) -> bool {
        self.block == BlockId::Air && !self.wall.is_present()
    }
}

/// Pose of one entity for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPose {
    /// Kind, used to pick the sprite.
    pub kind: EntityKind,
    /// Centre in tiles.
    pub pos: Vec2,
    /// Half extents in tiles.
    pub half: Vec2,
    /// Facing.
    pub facing: Facing,
    /// Drawn highlighted while invulnerable.
    pub flash: bool,
}

/// Draws one tile into a pixel square of `size` at (`px`, `py`).
pub trait TileArtist {
    /// Draw `tile` at the given pixel origin.
    fn draw_tile(&self, canvas: &mut RgbaImage, px: u32, py: u32, size: u32, tile: TileSample);
}

/// Draws one entity given its pose.
pub trait EntityArtist {
    /// Draw `pose`; `origin` is the pixel position of tile (0, 0) on the canvas.
    fn draw_entity(&self, canvas: &mut RgbaImage, origin: Vec2, tile_px: u32, pose: &EntityPose);
}

/// Solid colours per tile kind, darkened by light. Used for screenshots and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatColorArtist;

impl FlatColorArtist {
    /// Base colour of a block.
    pub fn block_color(block: BlockId) -> [u8; 4] {
        match block {
            BlockId::Air => [0, 0, 0, 0],
            BlockId::Grass => [88, 160, 64, 255],
            BlockId::Dirt => [134, 96, 67, 255],
            BlockId::Stone => [120, 120, 128, 255],
            BlockId::Bedrock => [40, 40, 44, 255],
            BlockId::CoalOre => [60, 60, 64, 255],
            BlockId::IronOre => [196, 160, 132, 255],
            BlockId::GoldOre => [236, 200, 70, 255],
            BlockId::DiamondOre => [96, 220, 230, 255],
            BlockId::Log => [110, 80, 48, 255],
            BlockId::Leaves => [56, 128, 48, 230],
            BlockId::Planks => [180, 140, 90, 255],
            BlockId::Brick => [150, 70, 60, 255],
            BlockId::Glass => [200, 230, 240, 110],
            BlockId::Flower => [220, 80, 140, 255],
        }
    }

    /// Base colour of a wall (muted).
    pub fn wall_color(wall: WallId) -> [u8; 4] {
        match wall {
            WallId::None => [0, 0, 0, 0],
            WallId::Dirt => [80, 58, 40, 255],
            WallId::Stone => [70, 70, 76, 255],
            WallId::Planks => [110, 86, 56, 255],
            WallId::Brick => [92, 44, 38, 255],
        }
    }

    /// Colour of an entity kind.
    pub fn entity_color(kind: EntityKind) -> [u8; 4] {
        match kind {
            EntityKind::Player => [66, 110, 220, 255],
            EntityKind::Slime => [80, 210, 90, 220],
            EntityKind::Zombie => [70, 140, 80, 255],
            EntityKind::Guide => [210, 170, 120, 255],
        }
    }
}

fn shade(color: [u8; 4], light: f32) -> Rgba<u8> {
    let l = light.clamp(0.0, 1.0);
    let scale = |c: u8| (f32::from(c) * l).round() as u8;
    Rgba([scale(color[0]), scale(color[1]), scale(color[2]), color[3]])
}

fn fill(canvas: &mut RgbaImage, x0: i64, y0: i64, w: i64, h: i64, color: Rgba<u8>) {
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for y in y0.max(0)..(y0 + h).min(ch) {
        for x in x0.max(0)..(x0 + w).min(cw) {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

impl TileArtist for FlatColorArtist {
    fn draw_tile(&self, canvas: &mut RgbaImage, px: u32, py: u32, size: u32, tile: TileSample) {
        let (px, py, size) = (i64::from(px), i64::from(py), i64::from(size));
        if tile.wall.is_present() {
            let color = shade(Self::wall_color(tile.wall), tile.light * 0.7);
            fill(canvas, px, py, size, size, color);
        }
        if tile.block != BlockId::Air {
            let color = shade(Self::block_color(tile.block), tile.light);
            fill(canvas, px, py, size, size, color);
        }
    }
}

impl EntityArtist for FlatColorArtist {
    fn draw_entity(&self, canvas: &mut RgbaImage, origin: Vec2, tile_px: u32, pose: &EntityPose) {
        let scale = tile_px as f32;
        let min = origin + (pose.pos - pose.half) * scale;
        let size = pose.half * 2.0 * scale;
        let color = if pose.flash {
            Rgba([255, 255, 255, 255])
        } else {
            let c = Self::entity_color(pose.kind);
            Rgba(c)
        };
        fill(
            canvas,
            min.x.floor() as i64,
            min.y.floor() as i64,
            size.x.ceil() as i64,
            size.y.ceil() as i64,
            color,
        );
        // one-pixel eye on the facing side
        let eye_x = match pose.facing {
            Facing::Left => min.x + size.x * 0.25,
            Facing::Right => min.x + size.x * 0.75,
        };
        fill(
            canvas,
            eye_x.floor() as i64,
            (min.y + size.y * 0.25).floor() as i64,
            1,
            1,
            Rgba([16, 16, 16, 255]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn darkness_keeps_alpha() {
        let artist = FlatColorArtist;
        let mut canvas = RgbaImage::new(8, 8);
        let tile = TileSample {
            block: BlockId::Stone,
            wall: WallId::None,
            light: 0.0,
        };
        artist.draw_tile(&mut canvas, 0, 0, 8, tile);
        assert_eq!(canvas.get_pixel(3, 3), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn walls_show_behind_air() {
        let artist = FlatColorArtist;
        let mut canvas = RgbaImage::new(8, 8);
        let tile = TileSample {
            block: BlockId::Air,
            wall: WallId::Brick,
            light: 1.0,
        };
        assert!(!tile.is_transparent());
        artist.draw_tile(&mut canvas, 0, 0, 8, tile);
        assert_eq!(canvas.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn entities_clip_at_canvas_edges() {
        let artist = FlatColorArtist;
        let mut canvas = RgbaImage::new(16, 16);
        let pose = EntityPose {
            kind: EntityKind::Zombie,
            pos: Vec2::new(-0.2, 0.5),
            half: Vec2::new(0.4, 0.9),
            facing: Facing::Left,
            flash: false,
        };
        artist.draw_entity(&mut canvas, Vec2::ZERO, 8, &pose);
        assert_eq!(canvas.get_pixel(0, 2)[3], 255);
    }
}
