//! Frame composition and PNG output.

use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use tileforge_sim::{Entity, SimulationState};

use crate::artist::{EntityArtist, EntityPose};
use crate::cache::ChunkRenderCache;
use crate::viewport::Viewport;

const NIGHT_SKY: [f32; 3] = [12.0, 16.0, 40.0];
const DAY_SKY: [f32; 3] = [120.0, 180.0, 240.0];

/// Sky colour for a daylight level in `[0, 1]`.
pub fn sky_color(daylight: f32) -> Rgba<u8> {
    let t = daylight.clamp(0.0, 1.0);
    let mix = |i: usize| (NIGHT_SKY[i] + (DAY_SKY[i] - NIGHT_SKY[i]) * t).round() as u8;
    Rgba([mix(0), mix(1), mix(2), 255])
}

/// Drawing pose of a simulated entity.
pub fn pose_of(entity: &Entity) -> EntityPose {
    EntityPose {
        kind: entity.kind,
        pos: entity.body.pos,
        half: entity.body.half,
        facing: entity.facing,
        flash: entity.invulnerable > 0.0,
    }
}

/// Compose one frame: sky, cached chunks, then every entity.
///
/// The cache must already be updated for `view`.
pub fn compose_frame(
    state: &SimulationState,
    cache: &ChunkRenderCache,
    view: &Viewport,
    artist: &dyn EntityArtist,
) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(view.width, view.height, sky_color(state.clock.daylight()));
    cache.draw(view, &mut canvas);

    let origin = view.origin();
    let tile_px = cache.config().tile_px;
    let entities = state
        .npcs
        .values()
        .chain(state.enemies.values())
        .chain(state.players.values());
    for entity in entities {
        artist.draw_entity(&mut canvas, origin, tile_px, &pose_of(entity));
    }
    canvas
}

/// Write an RGBA8 image to disk as a PNG.
pub fn write_png(path: &Path, image: &RgbaImage) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path).context("failed to create screenshot png")?;
    let encoder = PngEncoder::new_with_quality(file, CompressionType::Fast, FilterType::NoFilter);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .context("failed to write screenshot png")?;
    Ok(())
}
