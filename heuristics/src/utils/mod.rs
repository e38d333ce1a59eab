//! Randomization and sampling primitives with no dependency on the dispatch
//! domain model, shared between the solver's greedy and post-optimization
//! stages.

mod random;
pub use self::random::{DefaultRandom, Random};

mod iterators;
pub use self::iterators::{create_range_sampling_iter, CollectGroupBy, SelectionSamplingIterator};
