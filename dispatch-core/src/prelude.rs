//! Re-exports of the generic scaffolding from `dispatch-heuristics`, plus
//! this crate's own error type, so downstream modules depend on one path.

pub use dispatch_heuristics::prelude::{DefaultRandom, Float, GenericError, GenericResult, InfoLogger, Random};

pub use crate::error::EngineError;
