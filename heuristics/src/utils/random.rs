use crate::prelude::Float;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Mutex;

/// Abstracts random decisions made by the assignment and post-optimization
/// passes so that a run can be replayed deterministically from a seed.
pub trait Random: Send + Sync + fmt::Debug {
    /// Returns an integer in `[from, to]`.
    fn uniform_int(&self, from: i32, to: i32) -> i32;

    /// Returns a real number in `[from, to)`.
    fn uniform_real(&self, from: Float, to: Float) -> Float;

    /// Returns `true` with the given probability (clamped to `[0, 1]`).
    fn is_hit(&self, probability: Float) -> bool;

    /// Picks an index into `weights` with probability proportional to its
    /// weight. Panics if `weights` is empty or all-zero.
    fn weighted(&self, weights: &[usize]) -> usize;
}

/// Seeded, thread-safe default [`Random`] implementation.
///
/// Held once per run inside `RunContext` so that every sampling decision in
/// post-optimization traces back to a single reproducible seed.
pub struct DefaultRandom {
    rng: Mutex<SmallRng>,
}

impl fmt::Debug for DefaultRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultRandom").finish_non_exhaustive()
    }
}

impl Default for DefaultRandom {
    fn default() -> Self {
        Self { rng: Mutex::new(SmallRng::from_entropy()) }
    }
}

impl DefaultRandom {
    /// Creates a generator seeded for deterministic replay.
    pub fn new_with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(SmallRng::seed_from_u64(seed)) }
    }
}

impl Random for DefaultRandom {
    fn uniform_int(&self, from: i32, to: i32) -> i32 {
        if from == to {
            return from;
        }
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        self.rng.lock().unwrap().gen_range(from..=to)
    }

    fn uniform_real(&self, from: Float, to: Float) -> Float {
        if (from - to).abs() < Float::EPSILON {
            return from;
        }
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        self.rng.lock().unwrap().gen_range(from..to)
    }

    fn is_hit(&self, probability: Float) -> bool {
        let probability = probability.clamp(0., 1.);
        self.rng.lock().unwrap().gen_bool(probability)
    }

    fn weighted(&self, weights: &[usize]) -> usize {
        let total: usize = weights.iter().sum();
        assert!(total > 0, "weighted selection requires at least one non-zero weight");

        let pick = self.rng.lock().unwrap().gen_range(0..total);
        let mut acc = 0usize;
        for (idx, weight) in weights.iter().enumerate() {
            acc += weight;
            if pick < acc {
                return idx;
            }
        }

        weights.len() - 1
    }
}

#[cfg(test)]
#[path = "../../tests/unit/utils/random_test.rs"]
mod random_test;
