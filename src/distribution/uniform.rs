//! Uniform random target selection
//!
//! Uses the xoshiro256++ PRNG. A fixed seed makes the task stream
//! reproducible across runs.

use super::Distribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniform random distribution over target indices
pub struct UniformDistribution {
    rng: Xoshiro256PlusPlus,
}

impl UniformDistribution {
    /// Create a distribution seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Create a distribution with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        }
    }
}

impl Default for UniformDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Distribution for UniformDistribution {
    #[inline(always)]
    fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_in_range() {
        let mut dist = UniformDistribution::new();
        for _ in 0..100 {
            assert!(dist.next_index(3) < 3);
        }
        assert_eq!(dist.next_index(0), 0);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = UniformDistribution::with_seed(12345);
        let mut b = UniformDistribution::from_optional_seed(Some(12345));
        for _ in 0..20 {
            assert_eq!(a.next_index(1000), b.next_index(1000));
        }
    }

    #[test]
    fn test_every_target_gets_picked() {
        let targets = ["A", "B", "C", "D"];
        let mut dist = UniformDistribution::with_seed(42);
        let mut seen = [0u32; 4];

        for _ in 0..4000 {
            let target = dist.pick(&targets).unwrap();
            let i = targets.iter().position(|t| t == target).unwrap();
            seen[i] += 1;
        }

        // Each should land near 1000
        for count in seen {
            assert!(count > 800 && count < 1200, "skewed count {}", count);
        }
    }

    #[test]
    fn test_pick_empty() {
        let mut dist = UniformDistribution::with_seed(1);
        let empty: [&str; 0] = [];
        assert!(dist.pick(&empty).is_none());
    }
}
