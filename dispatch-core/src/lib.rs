//! Field-service dispatch assignment engine. Trains a skill-compatibility
//! table and two predictors from history (C2-C4), filters and scores
//! candidate technicians per dispatch (C5/C6), chooses adaptive thresholds
//! (C7), and commits assignments via a greedy fallback ladder followed by
//! local-search post-optimization (C8/C9), all driven by [`driver::run`]
//! (C10).

pub mod construction;
pub mod context;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod geo;
pub mod models;
pub mod policy;
pub mod predict;
pub mod prelude;
pub mod skill_compat;
pub mod solver;

pub use context::{RunConfig, RunContext};
pub use driver::{run, DispatchDelta, RunDiagnostics, RunResult};
pub use error::EngineError;
