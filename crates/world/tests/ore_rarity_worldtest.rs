//! Ore Rarity Worldtest
//!
//! Generates 1,000 narrow worlds and checks that every ore tile satisfies its
//! own depth and noise rule, and that rarer ores always sit at least as deep
//! and behind at least as strict a threshold as coal.

use std::time::Instant;

use tileforge_world::{BlockId, GenerationParams, WorldDimensions, WorldGenerator};

const SEEDS: u32 = 1_000;
const DIMS: WorldDimensions = WorldDimensions {
    width: 24,
    height: 140,
};

#[test]
fn ore_rarity_worldtest() {
    let start = Instant::now();
    println!("\n=== Ore Rarity Worldtest ===");
    println!("  Seeds: {}  Grid: {}x{}", SEEDS, DIMS.width, DIMS.height);

    let params = GenerationParams::default();
    let coal = params.ores[0];
    for pair in params.ores.windows(2) {
        assert!(pair[1].min_depth >= pair[0].min_depth);
        assert!(pair[1].threshold >= pair[0].threshold);
    }

    let mut counts = [0usize; 4];
    for seed in 0..SEEDS {
        let generator = WorldGenerator::with_params(seed, DIMS, params.clone());
        let world = generator.generate().expect("generation failed");

        for x in 0..DIMS.width {
            let surface = generator.surface_height(x);
            for y in surface..DIMS.height {
                let block = world.block(x as i32, y as i32).unwrap();
                let Some(slot) = params.ores.iter().position(|rule| rule.block == block) else {
                    continue;
                };
                let rule = params.ores[slot];
                let depth = y - surface;
                assert!(
                    rule.matches(generator.noise(), x, y, depth),
                    "seed {seed}: {block:?} at ({x}, {y}) violates its rule"
                );
                if block == BlockId::DiamondOre {
                    assert!(depth >= coal.min_depth);
                    assert!(rule.sample(generator.noise(), x, y) > coal.threshold);
                }
                counts[slot] += 1;
            }
        }
    }

    println!(
        "  coal={} iron={} gold={} diamond={}",
        counts[0], counts[1], counts[2], counts[3]
    );
    assert!(counts[0] > counts[3], "diamond should be rarer than coal");
    println!("  Completed in {:?}", start.elapsed());
}
