use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index into the progressive relaxation ladder (§4.8). `0` is strict,
/// `6` is forced (never relaxes calendar unavailability).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FallbackLevel(pub u8);

impl FallbackLevel {
    pub const L0: FallbackLevel = FallbackLevel(0);
    pub const L1: FallbackLevel = FallbackLevel(1);
    pub const L2: FallbackLevel = FallbackLevel(2);
    pub const L3: FallbackLevel = FallbackLevel(3);
    pub const L4: FallbackLevel = FallbackLevel(4);
    pub const L5: FallbackLevel = FallbackLevel(5);
    pub const L6: FallbackLevel = FallbackLevel(6);

    pub const MAX: FallbackLevel = FallbackLevel::L6;

    pub fn is_forced(self) -> bool {
        self == FallbackLevel::L6
    }

    pub fn next(self) -> Option<FallbackLevel> {
        (self.0 < FallbackLevel::MAX.0).then_some(FallbackLevel(self.0 + 1))
    }
}

impl std::fmt::Display for FallbackLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Why a dispatch could not be assigned even at L6. Never produced by a
/// propagated `Result` error; always a normal, logged outcome (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnassignedReason {
    NoCalendar,
    NoCityTech,
    BelowThreshold,
    AllOvercap,
    DistanceFilter,
}

impl std::fmt::Display for UnassignedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnassignedReason::NoCalendar => "no_calendar",
            UnassignedReason::NoCityTech => "no_city_tech",
            UnassignedReason::BelowThreshold => "below_threshold",
            UnassignedReason::AllOvercap => "all_overcap",
            UnassignedReason::DistanceFilter => "distance_filter",
        };
        write!(f, "{s}")
    }
}

/// A committed technician assignment for one dispatch. Produced by the
/// greedy pass (C8), possibly replaced wholesale (never split) by
/// post-optimization (C9), then frozen for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub dispatch_id: String,
    pub technician_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub predicted_success: f64,
    pub predicted_duration: f64,
    pub distance_km: Option<f64>,
    pub skill_match_score: f64,
    pub workload_ratio_after: f64,
    pub score: f64,
    pub warnings: Vec<String>,
    pub fallback_level: FallbackLevel,
}

impl Assignment {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Outcome of attempting to place one dispatch: either a committed
/// assignment or a classified non-error "no match" result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    Assigned(Assignment),
    Unassigned { dispatch_id: String, reason: UnassignedReason },
}

impl DispatchOutcome {
    pub fn dispatch_id(&self) -> &str {
        match self {
            DispatchOutcome::Assigned(a) => &a.dispatch_id,
            DispatchOutcome::Unassigned { dispatch_id, .. } => dispatch_id,
        }
    }
}
