use std::fmt;

/// Anything that can report a single scalar fitness value to compare against.
/// Higher is always better; callers invert the sign themselves if a lower
/// value should win.
pub trait Individual {
    fn fitness(&self) -> f64;
}

/// Retains only the single best individual seen so far.
///
/// Used by the post-optimization loop (`dispatch-core::solver::postopt`) to
/// track the best assignment-table snapshot across passes without paying for
/// a full population-based search: each pass either beats the incumbent or
/// is discarded, and a pass that beats nothing signals the loop to stop.
pub struct Greedy<T: Individual + Clone> {
    capacity: usize,
    best: Option<T>,
}

impl<T: Individual + Clone> Greedy<T> {
    /// Creates a new tracker, optionally seeded with an initial solution.
    /// `capacity` is retained for symmetry with population-based greedy
    /// variants but this tracker only ever keeps one individual.
    pub fn new(capacity: usize, initial: Option<T>) -> Self {
        assert!(capacity >= 1, "greedy tracker capacity must be at least 1");
        Self { capacity, best: initial }
    }

    /// Adds an individual, replacing the incumbent if strictly better.
    /// Returns `true` when the individual became (or remains) the best.
    pub fn add(&mut self, individual: T) -> bool {
        match &self.best {
            None => {
                self.best = Some(individual);
                true
            }
            Some(current) if individual.fitness() > current.fitness() => {
                self.best = Some(individual);
                true
            }
            _ => false,
        }
    }

    /// Adds several individuals, keeping whichever ends up best.
    pub fn add_all(&mut self, individuals: Vec<T>) -> bool {
        individuals.into_iter().fold(false, |improved, individual| self.add(individual) || improved)
    }

    /// Number of individuals currently retained (0 or 1).
    pub fn size(&self) -> usize {
        self.best.is_some() as usize
    }

    /// Iterates retained individuals, best first.
    pub fn ranked(&self) -> impl Iterator<Item = &T> {
        self.best.iter()
    }

    /// Alias for [`Greedy::ranked`] kept for readability at call sites that
    /// pick a parent to mutate.
    pub fn select(&self) -> impl Iterator<Item = &T> {
        self.best.iter()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Individual + Clone> fmt::Display for Greedy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.best {
            Some(individual) => write!(f, "[{:.7}]", individual.fitness()),
            None => write!(f, "[]"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/population/greedy_test.rs"]
mod greedy_test;
