//! Per-dispatch decision trace (§9 "Diagnostics"): the chosen candidate,
//! the top-k rejected candidates' scores, warnings, and fallback level,
//! retained for offline analysis. `dispatch-format` can render this but
//! nothing exports it; that stays out of scope.

use crate::models::{DispatchOutcome, FallbackLevel};

/// How many rejected candidates' scores to keep per dispatch.
pub const TOP_REJECTED_CANDIDATES: usize = 3;

/// A runner-up candidate that was scored but not chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub technician_id: String,
    pub score: f64,
    pub distance_km: Option<f64>,
}

/// One dispatch's full assignment decision, independent of whether it
/// ended up assigned or not.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTrace {
    pub dispatch_id: String,
    pub outcome: DispatchOutcome,
    pub fallback_level_reached: FallbackLevel,
    pub rejected: Vec<RejectedCandidate>,
}

impl DecisionTrace {
    pub fn was_assigned(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Assigned(_))
    }
}
