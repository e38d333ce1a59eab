//! Best-so-far tracking used by local-search passes.

mod greedy;
pub use self::greedy::{Greedy, Individual};
