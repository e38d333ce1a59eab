//! Generic, domain-agnostic randomization and local-search scaffolding
//! shared across the dispatch engine crates.
//!
//! Nothing in this crate knows about dispatches, technicians, or scores. It
//! provides the same kind of reusable primitives a metaheuristics toolkit
//! would, so that `dispatch-core` can focus purely on domain logic.

pub mod population;
pub mod utils;

pub mod prelude;
