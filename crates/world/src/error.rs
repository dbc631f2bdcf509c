//! Error types for world generation and layer decoding.

use thiserror::Error;

/// Fatal faults raised while building a new world.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldGenError {
    /// The requested grid cannot hold terrain above the boundary rows.
    #[error("invalid world dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width in tiles.
        width: usize,
        /// Requested height in tiles.
        height: usize,
    },
    /// Terrain parameters would push the surface outside the grid.
    #[error("terrain overflows the grid (ground level {ground_level}, amplitude {amplitude})")]
    TerrainOverflow {
        /// Configured ground level row.
        ground_level: usize,
        /// Configured height amplitude.
        amplitude: usize,
    },
}

/// Faults raised while rebuilding a world from raw layers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// A layer buffer does not match `width * height`.
    #[error("layer size mismatch: expected {expected} cells, got {actual}")]
    LayerSizeMismatch {
        /// Expected cell count.
        expected: usize,
        /// Received cell count.
        actual: usize,
    },
    /// Two worlds that must share a grid have different sizes.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// This world's `(width, height)`.
        expected: (usize, usize),
        /// The other world's `(width, height)`.
        actual: (usize, usize),
    },
    /// A byte does not name a known block or wall.
    #[error("unknown tile id {0}")]
    UnknownTile(u8),
}
