//! Deterministic PRNG for seeded sampling and stochastic optimizers.
//!
//! `SplitMix64` drives every random choice in msmlump: discrete trajectory
//! sampling from a fitted model, frame draws per state, MVCA random
//! landmarks and the PCCA+ basin-hopping perturbations. The same seed
//! always reproduces the same result.

use crate::error::{Error, Result};

/// SplitMix64 PRNG: single u64 state, period 2^64, passes BigCrush.
///
/// # Example
/// ```
/// use msmlump_core::SplitMix64;
///
/// let mut rng = SplitMix64::new(42);
/// let state = rng.sample_categorical(&[0.2, 0.8]).unwrap();
/// assert!(state < 2);
/// ```
#[derive(Debug, Clone)]
pub struct SplitMix64(u64);

impl SplitMix64 {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Seed from an optional user value, falling back to a fixed constant
    /// so unseeded runs are still reproducible.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        Self(seed.unwrap_or(0x5EED_0F_4D_11A5))
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    /// Uniform f64 in [0, 1) from the top 53 bits.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Standard normal sample via Box-Muller.
    pub fn next_gaussian(&mut self) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Uniform integer in [0, n). `n` must be positive.
    #[inline]
    pub fn next_below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        // Lemire's multiply-shift; bias is below 2^-64 * n.
        ((self.next_u64() as u128 * n as u128) >> 64) as usize
    }

    /// Draw an index with probability proportional to `weights`.
    ///
    /// Weights need not be normalized but must be finite, non-negative and
    /// have a positive sum.
    pub fn sample_categorical(&mut self, weights: &[f64]) -> Result<usize> {
        let total: f64 = weights.iter().sum();
        let bad_total = total.is_nan() || total <= 0.0 || total.is_infinite();
        if bad_total || weights.iter().any(|&w| w < 0.0) {
            return Err(Error::InvalidParameter(format!(
                "categorical weights must be non-negative with a positive sum (sum = {})",
                total
            )));
        }
        let target = self.next_f64() * total;
        let mut acc = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            acc += w;
            if target < acc {
                return Ok(i);
            }
        }
        // Rounding can leave target == total; return the last non-zero weight.
        Ok(weights.iter().rposition(|&w| w > 0.0).unwrap_or(0))
    }

    /// Sample `k` distinct indices from [0, n) (partial Fisher-Yates).
    pub fn choose_distinct(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = i + self.next_below(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let mut a = SplitMix64::new(42);
        let mut b = SplitMix64::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_f64_range() {
        let mut rng = SplitMix64::new(42);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "next_f64() = {} out of [0, 1)", v);
        }
    }

    #[test]
    fn test_gaussian_moments() {
        let mut rng = SplitMix64::new(12345);
        let n = 10_000;
        let samples: Vec<f64> = (0..n).map(|_| rng.next_gaussian()).collect();
        let mean: f64 = samples.iter().sum::<f64>() / n as f64;
        let variance: f64 = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.1, "Gaussian mean = {}, expected ~0.0", mean);
        assert!((variance - 1.0).abs() < 0.2, "Gaussian variance = {}", variance);
    }

    #[test]
    fn test_categorical_frequencies() {
        let mut rng = SplitMix64::new(7);
        let weights = [1.0, 0.0, 3.0];
        let mut counts = [0usize; 3];
        for _ in 0..20_000 {
            counts[rng.sample_categorical(&weights).unwrap()] += 1;
        }
        assert_eq!(counts[1], 0);
        let frac = counts[2] as f64 / 20_000.0;
        assert!((frac - 0.75).abs() < 0.02, "frac = {}", frac);
    }

    #[test]
    fn test_categorical_rejects_bad_weights() {
        let mut rng = SplitMix64::new(1);
        assert!(rng.sample_categorical(&[0.0, 0.0]).is_err());
        assert!(rng.sample_categorical(&[1.0, -0.5]).is_err());
    }

    #[test]
    fn test_choose_distinct() {
        let mut rng = SplitMix64::new(3);
        let mut picked = rng.choose_distinct(10, 4);
        assert_eq!(picked.len(), 4);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 4);
        assert!(picked.iter().all(|&i| i < 10));
        assert_eq!(rng.choose_distinct(3, 10).len(), 3);
    }
}
