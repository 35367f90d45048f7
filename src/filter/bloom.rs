// File: src/filter/bloom.rs
use crate::config::validate_error_rate;
use crate::core::types::FilterStats;
use crate::error::Result;
use ahash::RandomState;
use std::f64::consts::LN_2;
use std::sync::LazyLock;

// Two fixed-seed hashers give independent h1/h2 for double hashing.
static HASHER_A: LazyLock<RandomState> =
    LazyLock::new(|| RandomState::with_seeds(808259318, 750368348, 84901999, 789810389));
static HASHER_B: LazyLock<RandomState> =
    LazyLock::new(|| RandomState::with_seeds(311458061, 963040277, 174932117, 502183411));

/// A fixed-size Bloom filter over normalized words.
///
/// `contains` never returns false for an inserted word. It may return true
/// for a word that was never inserted, at roughly the configured error rate
/// while the insert count stays under `capacity`. There is no removal;
/// a filter is rebuilt to shrink.
#[derive(Debug, Clone)]
pub struct MembershipFilter {
    bits: Vec<u64>,
    num_bits: u64,
    hash_count: u32,
    capacity: usize,
    error_rate: f64,
    set_bits: u64,
}

impl MembershipFilter {
    /// Creates an empty filter sized for `max(expected, min_capacity)` words.
    pub fn with_capacity(expected: usize, min_capacity: usize, error_rate: f64) -> Result<Self> {
        validate_error_rate(error_rate)?;
        let capacity = expected.max(min_capacity).max(1);
        let n = capacity as f64;

        let num_bits = ((-n * error_rate.ln()) / (LN_2 * LN_2)).ceil().max(1.0) as u64;
        let hash_count = ((num_bits as f64 / n) * LN_2).round().max(1.0) as u32;
        let words = num_bits.div_ceil(64) as usize;

        tracing::debug!(capacity, num_bits, hash_count, "sized membership filter");

        Ok(Self {
            bits: vec![0u64; words],
            num_bits,
            hash_count,
            capacity,
            error_rate,
            set_bits: 0,
        })
    }

    /// Builds a filter holding every word of `words`.
    pub fn build<I, S>(words: I, min_capacity: usize, error_rate: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: ExactSizeIterator,
        S: AsRef<str>,
    {
        let words = words.into_iter();
        let mut filter = Self::with_capacity(words.len(), min_capacity, error_rate)?;
        for word in words {
            filter.insert(word.as_ref());
        }
        Ok(filter)
    }

    /// Sets the k bits for `word`. Only reachable while a generation is being built.
    pub(crate) fn insert(&mut self, word: &str) {
        let (h1, h2) = hash_pair(word);
        for i in 0..self.hash_count as u64 {
            let bit = self.index(h1, h2, i);
            let (slot, mask) = ((bit / 64) as usize, 1u64 << (bit % 64));
            if self.bits[slot] & mask == 0 {
                self.bits[slot] |= mask;
                self.set_bits += 1;
            }
        }
    }

    /// `false` means definitely absent, `true` means possibly present.
    pub fn contains(&self, word: &str) -> bool {
        let (h1, h2) = hash_pair(word);
        (0..self.hash_count as u64).all(|i| {
            let bit = self.index(h1, h2, i);
            self.bits[(bit / 64) as usize] & (1u64 << (bit % 64)) != 0
        })
    }

    /// Approximate distinct insert count from the fill ratio: -(m/k)·ln(1 - X/m).
    pub fn estimated_count(&self) -> usize {
        if self.set_bits == 0 {
            return 0;
        }
        let m = self.num_bits as f64;
        let k = self.hash_count as f64;
        let fill = self.set_bits as f64 / m;
        if fill >= 1.0 {
            // Saturated: the estimator diverges.
            return self.capacity.max(self.num_bits as usize);
        }
        (-(m / k) * (1.0 - fill).ln()).round() as usize
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            capacity: self.capacity,
            error_rate: self.error_rate,
            estimated_count: self.estimated_count(),
            is_empty: self.set_bits == 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    #[inline]
    fn index(&self, h1: u64, h2: u64, i: u64) -> u64 {
        h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits
    }
}

#[inline]
fn hash_pair(word: &str) -> (u64, u64) {
    let h1 = HASHER_A.hash_one(word.as_bytes());
    // Odd step so successive probes never collapse onto one bit.
    let h2 = HASHER_B.hash_one(word.as_bytes()) | 1;
    (h1, h2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpellError;

    #[test]
    fn test_sizing_follows_formula() {
        let filter = MembershipFilter::with_capacity(1_000, 1, 0.01).unwrap();
        // m = ceil(-1000·ln(0.01) / ln2²) = 9586, k = round(9.586·ln2) = 7
        assert_eq!(filter.num_bits(), 9586);
        assert_eq!(filter.hash_count(), 7);
        assert_eq!(filter.capacity(), 1_000);
    }

    #[test]
    fn test_empty_source_uses_capacity_floor() {
        let filter = MembershipFilter::build(Vec::<String>::new(), 100_000, 0.001).unwrap();
        assert_eq!(filter.capacity(), 100_000);
        let stats = filter.stats();
        assert!(stats.is_empty);
        assert_eq!(stats.estimated_count, 0);
        assert!(!filter.contains("anything"));
    }

    #[test]
    fn test_invalid_error_rate() {
        for rate in [0.0, -0.5, 1.01, f64::NAN] {
            let result = MembershipFilter::with_capacity(10, 10, rate);
            assert!(matches!(result, Err(SpellError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_error_rate_one_is_accepted() {
        let filter = MembershipFilter::build(["a"], 10, 1.0).unwrap();
        assert!(filter.hash_count() >= 1);
        assert!(filter.contains("a"));
    }

    #[test]
    fn test_no_false_negatives() {
        let words: Vec<String> = (0..5_000).map(|i| format!("word{}", i)).collect();
        let filter = MembershipFilter::build(words.iter(), 1, 0.01).unwrap();
        for word in &words {
            assert!(filter.contains(word), "false negative for {}", word);
        }
    }

    #[test]
    fn test_false_positive_rate_near_target() {
        let words: Vec<String> = (0..10_000).map(|i| format!("present-{}", i)).collect();
        let filter = MembershipFilter::build(words.iter(), 1, 0.01).unwrap();

        let trials = 100_000;
        let false_positives = (0..trials)
            .filter(|i| filter.contains(&format!("absent-{}", i)))
            .count();
        let rate = false_positives as f64 / trials as f64;
        assert!(rate < 0.02, "false positive rate {} too high", rate);
        assert!(rate > 0.002, "false positive rate {} suspiciously low", rate);
    }

    #[test]
    fn test_estimated_count_tracks_inserts() {
        let words: Vec<String> = (0..2_000).map(|i| format!("w{}", i)).collect();
        let filter = MembershipFilter::build(words.iter(), 10_000, 0.01).unwrap();
        let estimate = filter.estimated_count() as f64;
        assert!((estimate - 2_000.0).abs() < 100.0, "estimate {}", estimate);
    }

    #[test]
    fn test_duplicate_inserts_do_not_inflate_estimate() {
        let filter = MembershipFilter::build(["same", "same", "same"], 1_000, 0.01).unwrap();
        assert_eq!(filter.estimated_count(), 1);
    }
}
