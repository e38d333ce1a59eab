//! Common type aliases re-exported by every downstream crate.

use std::fmt;

/// Floating point type used throughout scoring and prediction math.
pub type Float = f64;

/// A boxed, type-erased error used at API boundaries where a concrete error
/// type would leak internal details across crate lines.
pub type GenericError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shorthand for a [`Result`] carrying a [`GenericError`].
pub type GenericResult<T> = Result<T, GenericError>;

/// Sink for free-form diagnostic lines emitted by training and optimization
/// passes. A run driver supplies an implementation backed by `tracing`; tests
/// typically supply one that records lines for assertion.
pub trait InfoLogger: fmt::Debug {
    /// Records a single log line.
    fn log(&self, message: &str);
}

pub use crate::utils::{DefaultRandom, Random, SelectionSamplingIterator};
