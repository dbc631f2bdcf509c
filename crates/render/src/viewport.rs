//! Pixel-space view rectangle over the tile grid.

use glam::Vec2;

/// Visible region in world pixels (tile `(0, 0)` starts at pixel `(0, 0)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge in world pixels.
    pub left: i64,
    /// Top edge in world pixels.
    pub top: i64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Viewport of `width x height` pixels centred on a tile-space point.
    pub fn centered_on(center: Vec2, width: u32, height: u32, tile_px: u32) -> Self {
        let cx = (center.x * tile_px as f32).round() as i64;
        let cy = (center.y * tile_px as f32).round() as i64;
        Self {
            left: cx - i64::from(width / 2),
            top: cy - i64::from(height / 2),
            width,
            height,
        }
    }

    /// Viewport covering a whole `tiles_w x tiles_h` grid.
    pub fn whole_world(tiles_w: usize, tiles_h: usize, tile_px: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width: tiles_w as u32 * tile_px,
            height: tiles_h as u32 * tile_px,
        }
    }

    /// Pixel position of tile `(0, 0)` on a canvas showing this viewport.
    pub fn origin(&self) -> Vec2 {
        Vec2::new(-self.left as f32, -self.top as f32)
    }

    /// Inclusive chunk index range touched by the viewport, widened by
    /// `margin` chunks and clamped to `cols x rows`. `None` when off the grid.
    pub fn chunk_span(
        &self,
        chunk_px: u32,
        margin: u32,
        cols: usize,
        rows: usize,
    ) -> Option<((usize, usize), (usize, usize))> {
        if cols == 0 || rows == 0 || chunk_px == 0 {
            return None;
        }
        let size = i64::from(chunk_px);
        let margin = i64::from(margin);
        let x0 = self.left.div_euclid(size) - margin;
        let y0 = self.top.div_euclid(size) - margin;
        let x1 = (self.left + i64::from(self.width) - 1).div_euclid(size) + margin;
        let y1 = (self.top + i64::from(self.height) - 1).div_euclid(size) + margin;
        let (max_x, max_y) = (cols as i64 - 1, rows as i64 - 1);
        if x1 < 0 || y1 < 0 || x0 > max_x || y0 > max_y {
            return None;
        }
        Some((
            (x0.max(0) as usize, x1.min(max_x) as usize),
            (y0.max(0) as usize, y1.min(max_y) as usize),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_includes_margin_and_clamps() {
        let view = Viewport {
            left: 200,
            top: 0,
            width: 256,
            height: 128,
        };
        // chunk_px 128: columns 1..=3 visible, 0..=4 with margin, clamped to 4 columns
        assert_eq!(view.chunk_span(128, 1, 4, 3), Some(((0, 3), (0, 1))));
        assert_eq!(view.chunk_span(128, 0, 10, 10), Some(((1, 3), (0, 0))));
    }

    #[test]
    fn off_grid_view_has_no_span() {
        let view = Viewport {
            left: -1000,
            top: -1000,
            width: 100,
            height: 100,
        };
        assert_eq!(view.chunk_span(128, 1, 4, 4), None);
    }

    #[test]
    fn centred_view_origin() {
        let view = Viewport::centered_on(Vec2::new(10.0, 10.0), 160, 80, 8);
        assert_eq!((view.left, view.top), (0, 40));
        assert_eq!(view.origin(), Vec2::new(0.0, -40.0));
    }
}
