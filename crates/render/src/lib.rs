#![warn(missing_docs)]
//! Presentation side of tileforge: chunk image cache and render collaborators.
//!
//! The core never owns pixels. It hands [`TileSample`]s and [`EntityPose`]s to
//! a [`TileArtist`] / [`EntityArtist`]; the [`ChunkRenderCache`] keeps those
//! drawings per 16x16 chunk so unchanged tiles are not redrawn each frame.

mod artist;
mod cache;
mod screenshot;
mod viewport;

pub use artist::{EntityArtist, EntityPose, FlatColorArtist, TileArtist, TileSample};
pub use cache::{CacheConfig, CacheStats, ChunkRenderCache};
pub use screenshot::{compose_frame, pose_of, sky_color, write_png};
pub use viewport::Viewport;
