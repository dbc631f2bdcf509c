//! Property-based tests for world generation
//!
//! Validates generation invariants for arbitrary 32-bit seeds:
//! - Same seed produces byte-identical block and wall layers
//! - The bottom boundary rows are always bedrock
//! - The ground-level row is never air
//! - A replayed change log reproduces the recording world exactly

use proptest::prelude::*;
use tileforge_testkit::world_fingerprint;
use tileforge_world::{
    BlockId, GenerationParams, TileWorld, WallId, WorldGenerator, BOUNDARY_ROWS,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: generation is a pure function of the seed.
    #[test]
    fn generation_is_deterministic(seed in any::<u32>()) {
        let a = WorldGenerator::new(seed).generate().unwrap();
        let b = WorldGenerator::new(seed).generate().unwrap();
        prop_assert_eq!(a.block_bytes(), b.block_bytes());
        prop_assert_eq!(a.wall_bytes(), b.wall_bytes());
        prop_assert_eq!(world_fingerprint(&a), world_fingerprint(&b));
    }

    /// Property: every cell in the boundary band is bedrock.
    #[test]
    fn boundary_rows_are_bedrock(seed in any::<u32>()) {
        let world = WorldGenerator::new(seed).generate().unwrap();
        let h = world.height() as i32;
        for y in (h - BOUNDARY_ROWS as i32)..h {
            for x in 0..world.width() as i32 {
                prop_assert_eq!(world.block(x, y), Some(BlockId::Bedrock), "({}, {})", x, y);
            }
        }
    }

    /// Property: the ground-level row is solid in every column.
    #[test]
    fn ground_level_row_is_never_air(seed in any::<u32>()) {
        let world = WorldGenerator::new(seed).generate().unwrap();
        let ground = GenerationParams::default().ground_level as i32;
        for x in 0..world.width() as i32 {
            let block = world.block(x, ground).unwrap();
            prop_assert!(block.blocks_movement(), "column {} has {:?}", x, block);
        }
    }

    /// Property: replaying the change log onto a fresh world with the same seed
    /// yields identical layers.
    #[test]
    fn change_log_replay_matches_host(
        seed in any::<u32>(),
        edits in prop::collection::vec((0i32..400, 0i32..200, 0u8..15, 0u8..5, any::<bool>()), 1..120),
    ) {
        let mut host = TileWorld::generate(seed).unwrap();
        for (x, y, block, wall, is_wall) in edits {
            if is_wall {
                host.set_wall(x, y, WallId::from_u8(wall).unwrap());
            } else {
                host.set_block(x, y, BlockId::from_u8(block).unwrap());
            }
        }

        let mut joiner = TileWorld::generate(seed).unwrap();
        joiner.replay(host.change_log());
        prop_assert_eq!(joiner.block_bytes(), host.block_bytes());
        prop_assert_eq!(joiner.wall_bytes(), host.wall_bytes());

        // Replaying the same log again lands on the same final state.
        let log = host.change_log().clone();
        joiner.replay(&log);
        prop_assert_eq!(joiner.block_bytes(), host.block_bytes());
        prop_assert_eq!(joiner.wall_bytes(), host.wall_bytes());
    }
}
