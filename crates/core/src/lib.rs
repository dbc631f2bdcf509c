#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod debug;
pub mod item;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use debug::{DebugFlags, DebugToggles};
pub use item::{ArmorPiece, ArmorSlot, ItemKind, ItemStack, Loadout, ToolMaterial, WearOutcome};

/// Fixed tick counter (one tick per rendered frame).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Nominal frame rate the `dt` unit is expressed in (dt = 1.0 is one 60 Hz frame).
pub const FRAMES_PER_SECOND: f32 = 60.0;

/// Helper to derive a reproducible RNG seeded by world + peer + tick domains.
pub fn scoped_rng(world_seed: u64, domain_hash: u64, tick: SimTick) -> StdRng {
    let seed = world_seed ^ domain_hash.rotate_left(17) ^ tick.0;
    StdRng::seed_from_u64(seed)
}

/// FNV-1a hash of a string, used to turn peer/entity ids into RNG domains.
pub fn domain_hash(name: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn scoped_rng_is_reproducible() {
        let mut a = scoped_rng(42, domain_hash("host"), SimTick(7));
        let mut b = scoped_rng(42, domain_hash("host"), SimTick(7));
        let xs: Vec<u32> = (0..8).map(|_| a.gen()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn domain_hash_separates_names() {
        assert_ne!(domain_hash("peer-a"), domain_hash("peer-b"));
        assert_eq!(domain_hash(""), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn tick_advances() {
        assert_eq!(SimTick::ZERO.advance(3), SimTick(3));
    }
}
