//! Error taxonomy for the engine library, split per §7: fatal, run-ending
//! failures live here; per-dispatch/per-candidate failures are folded into
//! `warnings`/`UnassignedReason` at their loop boundary and never reach
//! this type.

use thiserror::Error;

/// Top-level failure of a run. Each variant maps to one of the exit codes
/// in §6 (`Config` -> 1, `Ingest` -> 2, `Training`/`HardConstraintViolated`
/// -> 3, `Aborted` -> 4).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("ingest failed: {0}")]
    Ingest(String),

    #[error("training failed: {0}")]
    Training(String),

    #[error("hard constraint violated after the fact: {0}")]
    HardConstraintViolated(String),

    #[error("run aborted")]
    Aborted,
}

impl EngineError {
    /// Process exit code for this failure, per spec §6.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Config(_) => 1,
            EngineError::Ingest(_) => 2,
            EngineError::Training(_) => 3,
            EngineError::HardConstraintViolated(_) => 3,
            EngineError::Aborted => 4,
        }
    }
}
