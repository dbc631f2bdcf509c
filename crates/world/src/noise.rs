//! Seeded 2D value noise.
//!
//! Every peer regenerates terrain from the seed alone, so `noise2d` must be
//! bit-identical across processes. Only IEEE add/mul/floor are used on `f64`;
//! no transcendental functions, no platform-dependent intrinsics.

use crate::rng::Lcg;

const TABLE_SIZE: usize = 256;

/// Deterministic 2D value noise backed by a shuffled permutation table.
#[derive(Clone)]
pub struct SeededNoise {
    /// Permutation doubled to avoid wrapping on the second lookup.
    perm: [u8; TABLE_SIZE * 2],
    seed: u32,
}

impl std::fmt::Debug for SeededNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededNoise").field("seed", &self.seed).finish()
    }
}

impl SeededNoise {
    /// Build a noise function keyed on `seed`.
    pub fn new(seed: u32) -> Self {
        let mut noise = Self {
            perm: [0; TABLE_SIZE * 2],
            seed,
        };
        noise.seed(seed);
        noise
    }

    /// Reinitialize the permutation table (Fisher-Yates driven by an LCG).
    pub fn seed(&mut self, seed: u32) {
        let mut table = [0u8; TABLE_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }
        let mut rng = Lcg::new(seed);
        for i in (1..TABLE_SIZE).rev() {
            let j = rng.below(i as u32 + 1) as usize;
            table.swap(i, j);
        }
        for i in 0..TABLE_SIZE * 2 {
            self.perm[i] = table[i % TABLE_SIZE];
        }
        self.seed = seed;
    }

    /// Seed the table was last built from.
    pub fn current_seed(&self) -> u32 {
        self.seed
    }

    /// Pseudo-random value in `[-1, 1]` attached to a lattice point.
    #[inline]
    fn lattice(&self, xi: i64, yi: i64) -> f64 {
        let x = (xi & 0xff) as usize;
        let y = (yi & 0xff) as usize;
        let hash = self.perm[self.perm[x] as usize + y];
        f64::from(hash) / 127.5 - 1.0
    }

    /// Smoothly interpolated value noise, approximately in `[-1, 1]`.
    pub fn noise2d(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let xi = x0 as i64;
        let yi = y0 as i64;

        let v00 = self.lattice(xi, yi);
        let v10 = self.lattice(xi + 1, yi);
        let v01 = self.lattice(xi, yi + 1);
        let v11 = self.lattice(xi + 1, yi + 1);

        let sx = smoothstep(fx);
        let sy = smoothstep(fy);
        let top = lerp(v00, v10, sx);
        let bottom = lerp(v01, v11, sx);
        lerp(top, bottom, sy)
    }

    /// Sum of `octaves` layers with doubling frequency and halving amplitude,
    /// normalized back into `[-1, 1]`.
    pub fn fbm(&self, x: f64, y: f64, octaves: u32) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut norm = 0.0;
        for _ in 0..octaves.max(1) {
            total += self.noise2d(x * frequency, y * frequency) * amplitude;
            norm += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        total / norm
    }
}

#[inline]
fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_seed_is_bit_identical() {
        let a = SeededNoise::new(1234);
        let b = SeededNoise::new(1234);
        for i in 0..200 {
            let x = i as f64 * 0.37 - 20.0;
            let y = i as f64 * 0.11 + 3.0;
            assert_eq!(a.noise2d(x, y).to_bits(), b.noise2d(x, y).to_bits());
        }
    }

    #[test]
    fn reseeding_matches_fresh_instance() {
        let mut noise = SeededNoise::new(1);
        noise.seed(99);
        let fresh = SeededNoise::new(99);
        assert_eq!(noise.noise2d(3.5, 7.25), fresh.noise2d(3.5, 7.25));
        assert_eq!(noise.current_seed(), 99);
    }

    #[test]
    fn values_stay_in_range() {
        let noise = SeededNoise::new(u32::MAX);
        for i in 0..500 {
            let v = noise.noise2d(i as f64 * 0.731, -(i as f64) * 1.3);
            assert!((-1.0..=1.0).contains(&v), "noise out of range: {v}");
            let f = noise.fbm(i as f64 * 0.05, 0.0, 3);
            assert!((-1.0..=1.0).contains(&f), "fbm out of range: {f}");
        }
    }

    #[test]
    fn lattice_points_match_table() {
        let noise = SeededNoise::new(5);
        assert_eq!(noise.noise2d(2.0, 3.0), noise.lattice(2, 3));
    }

    #[test]
    fn different_seeds_differ() {
        let a = SeededNoise::new(1);
        let b = SeededNoise::new(2);
        let differs = (0..50).any(|i| a.noise2d(i as f64 * 0.5, 0.5) != b.noise2d(i as f64 * 0.5, 0.5));
        assert!(differs);
    }
}
