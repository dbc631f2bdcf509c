//! Foreground block and background wall identifiers.
//!
//! Both layers store one byte per cell. The numeric values are part of the
//! wire format (WORLD_CHANGE / WALL_CHANGE) and of persisted layers, so they
//! must never be reordered.

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Foreground block occupying a tile.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum BlockId {
    /// Empty cell.
    #[default]
    Air = 0,
    /// Surface row of a dirt column.
    Grass = 1,
    /// Shallow soil.
    Dirt = 2,
    /// Deep rock.
    Stone = 3,
    /// Indestructible world boundary.
    Bedrock = 4,
    /// Shallowest ore.
    CoalOre = 5,
    /// Second ore tier.
    IronOre = 6,
    /// Third ore tier.
    GoldOre = 7,
    /// Deepest, rarest ore.
    DiamondOre = 8,
    /// Tree trunk.
    Log = 9,
    /// Tree canopy.
    Leaves = 10,
    /// Crafted wooden planks.
    Planks = 11,
    /// Masonry used by structures.
    Brick = 12,
    /// Transparent building block.
    Glass = 13,
    /// Decorative surface plant.
    Flower = 14,
}

impl BlockId {
    /// Every block id, in numeric order.
    pub const ALL: [BlockId; 15] = [
        BlockId::Air,
        BlockId::Grass,
        BlockId::Dirt,
        BlockId::Stone,
        BlockId::Bedrock,
        BlockId::CoalOre,
        BlockId::IronOre,
        BlockId::GoldOre,
        BlockId::DiamondOre,
        BlockId::Log,
        BlockId::Leaves,
        BlockId::Planks,
        BlockId::Brick,
        BlockId::Glass,
        BlockId::Flower,
    ];

    /// Raw byte value.
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decode a raw byte.
    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Anything other than air.
    #[inline]
    pub fn is_solid(self) -> bool {
        self != BlockId::Air
    }

    /// Solid tiles that entities walk through and light passes (trunks, canopy, plants).
    #[inline]
    pub fn is_foliage(self) -> bool {
        matches!(self, BlockId::Log | BlockId::Leaves | BlockId::Flower)
    }

    /// Whether the tile stops entity movement.
    #[inline]
    pub fn blocks_movement(self) -> bool {
        self.is_solid() && !self.is_foliage()
    }

    /// Whether the tile attenuates light by the opaque factor.
    #[inline]
    pub fn is_opaque(self) -> bool {
        self.blocks_movement() && self != BlockId::Glass
    }

    /// Mining work needed to break the block, `None` when it cannot be broken.
    pub fn hardness(self) -> Option<f32> {
        match self {
            BlockId::Air | BlockId::Bedrock => None,
            BlockId::Flower | BlockId::Leaves => Some(5.0),
            BlockId::Grass | BlockId::Dirt => Some(20.0),
            BlockId::Log | BlockId::Planks | BlockId::Glass => Some(30.0),
            BlockId::Stone | BlockId::Brick => Some(45.0),
            BlockId::CoalOre => Some(50.0),
            BlockId::IronOre => Some(60.0),
            BlockId::GoldOre => Some(75.0),
            BlockId::DiamondOre => Some(100.0),
        }
    }

    /// Block dropped into the miner's loadout when broken.
    pub fn drop(self) -> Option<BlockId> {
        match self {
            BlockId::Air | BlockId::Bedrock | BlockId::Leaves | BlockId::Flower => None,
            BlockId::Grass => Some(BlockId::Dirt),
            BlockId::Log => Some(BlockId::Planks),
            other => Some(other),
        }
    }
}

impl TryFrom<u8> for BlockId {
    type Error = WorldError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_u8(raw).ok_or(WorldError::UnknownTile(raw))
    }
}

/// Background wall behind a tile.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum WallId {
    /// No wall (open sky behind).
    #[default]
    None = 0,
    /// Soil backdrop.
    Dirt = 1,
    /// Rock backdrop.
    Stone = 2,
    /// Wooden backdrop.
    Planks = 3,
    /// Masonry backdrop.
    Brick = 4,
}

impl WallId {
    /// Every wall id, in numeric order.
    pub const ALL: [WallId; 5] = [
        WallId::None,
        WallId::Dirt,
        WallId::Stone,
        WallId::Planks,
        WallId::Brick,
    ];

    /// Raw byte value.
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decode a raw byte.
    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Whether a wall is present.
    #[inline]
    pub fn is_present(self) -> bool {
        self != WallId::None
    }
}

impl TryFrom<u8> for WallId {
    type Error = WorldError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_u8(raw).ok_or(WorldError::UnknownTile(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_roundtrip() {
        for block in BlockId::ALL {
            assert_eq!(BlockId::from_u8(block.to_u8()), Some(block));
        }
        for wall in WallId::ALL {
            assert_eq!(WallId::from_u8(wall.to_u8()), Some(wall));
        }
        assert!(BlockId::try_from(200).is_err());
        assert!(WallId::try_from(5).is_err());
    }

    #[test]
    fn foliage_is_passable() {
        assert!(BlockId::Leaves.is_solid());
        assert!(!BlockId::Leaves.blocks_movement());
        assert!(!BlockId::Log.is_opaque());
        assert!(BlockId::Glass.blocks_movement());
        assert!(!BlockId::Glass.is_opaque());
    }

    #[test]
    fn bedrock_is_unbreakable() {
        assert_eq!(BlockId::Bedrock.hardness(), None);
        assert_eq!(BlockId::Air.hardness(), None);
        assert!(BlockId::DiamondOre.hardness() > BlockId::CoalOre.hardness());
    }
}
