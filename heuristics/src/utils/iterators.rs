use crate::prelude::Random;
use std::ops::Range;
use std::sync::Arc;

/// Samples `amount` items out of `iterator` without replacement, using
/// Knuth's selection-sampling technique (Algorithm S, TAOCP vol. 2, 3.4.2):
/// a single forward pass over the source that keeps relative order and needs
/// no extra storage. When `amount` exceeds the number of available items,
/// every item is yielded.
pub struct SelectionSamplingIterator<I: Iterator + ExactSizeIterator> {
    iterator: I,
    needed: usize,
    remaining: usize,
    random: Arc<dyn Random>,
}

impl<I: Iterator + ExactSizeIterator> SelectionSamplingIterator<I> {
    /// Creates a new sampling iterator over `iterator`, yielding up to `amount` items.
    pub fn new(iterator: I, amount: usize, random: Arc<dyn Random>) -> Self {
        let remaining = iterator.len();
        Self { iterator, needed: amount.min(remaining), remaining, random }
    }
}

impl<I: Iterator + ExactSizeIterator> Iterator for SelectionSamplingIterator<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while self.needed > 0 {
            let item = self.iterator.next()?;
            let hit = self.random.uniform_int(0, self.remaining as i32 - 1) < self.needed as i32;
            self.remaining -= 1;
            if hit {
                self.needed -= 1;
                return Some(item);
            }
        }
        None
    }
}

/// Borrowing counterpart of [`SelectionSamplingIterator`] for the common
/// case of sampling indices out of a `Range<usize>` without needing to share
/// ownership of the random source.
pub fn create_range_sampling_iter(
    range: Range<usize>,
    amount: usize,
    random: &dyn Random,
) -> impl Iterator<Item = usize> + '_ {
    let remaining = range.len();
    RangeSamplingIterator { range, needed: amount.min(remaining), remaining, random }
}

struct RangeSamplingIterator<'a> {
    range: Range<usize>,
    needed: usize,
    remaining: usize,
    random: &'a dyn Random,
}

impl<'a> Iterator for RangeSamplingIterator<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.needed > 0 {
            let item = self.range.next()?;
            let hit = self.random.uniform_int(0, self.remaining as i32 - 1) < self.needed as i32;
            self.remaining -= 1;
            if hit {
                self.needed -= 1;
                return Some(item);
            }
        }
        None
    }
}

/// Groups an iterator of `(key, value)` pairs into insertion-ordered buckets.
///
/// Used by the skill-compatibility learner and feature builders to aggregate
/// historical rows without pulling in a dataframe dependency.
pub trait CollectGroupBy: Iterator {
    fn collect_group_by_key<K, V, FK>(self, key_fn: FK) -> hashbrown::HashMap<K, Vec<V>>
    where
        Self: Iterator<Item = V> + Sized,
        K: std::hash::Hash + Eq,
        FK: Fn(&V) -> K,
    {
        let mut groups: hashbrown::HashMap<K, Vec<V>> = hashbrown::HashMap::new();
        for item in self {
            groups.entry(key_fn(&item)).or_default().push(item);
        }
        groups
    }
}

impl<T: Iterator> CollectGroupBy for T {}

#[cfg(test)]
#[path = "../../tests/unit/utils/iterators_test.rs"]
mod iterators_test;
