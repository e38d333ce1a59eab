//! C6: per-candidate scoring and the diagnostic dispatch grade, per §4.6.

/// Run-configurable scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStrategy {
    /// `score = success`. Distance/workload/overrun already enter `success`
    /// through C3's features. The default.
    PureSuccess,
    WeightedComposite,
}

impl Default for ScoringStrategy {
    fn default() -> Self {
        ScoringStrategy::PureSuccess
    }
}

/// Inputs to one candidate's score, already computed by C1/C3/C5.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInputs {
    pub success: f64,
    pub skill_confidence_multiplier: f64,
    pub distance_km: Option<f64>,
    pub workload_ratio_after: f64,
    pub predicted_duration_min: f64,
    pub window_minutes: f64,
    pub max_acceptable_distance_km: f64,
}

impl ScoringInputs {
    pub fn overrun_min(&self) -> f64 {
        self.predicted_duration_min - self.window_minutes
    }
}

/// Overrun normalization ceiling for the weighted-composite strategy's
/// `overrun_component`. Spec §4.6 names the shape but not this constant;
/// two hours is the ceiling beyond which overrun risk is scored as total.
const MAX_OVERRUN_MINUTES: f64 = 120.0;

fn workload_component(workload_ratio_after: f64) -> f64 {
    if workload_ratio_after <= 0.80 {
        1.0
    } else if workload_ratio_after <= 1.00 {
        1.0 - (workload_ratio_after - 0.80) / 0.20
    } else {
        -50.0
    }
}

fn distance_component(distance_km: Option<f64>, max_distance: f64) -> f64 {
    match distance_km {
        Some(d) if max_distance > 0.0 => (1.0 - d / max_distance).clamp(-1.0, 1.0),
        _ => 0.0,
    }
}

fn overrun_component(overrun_min: f64) -> f64 {
    if overrun_min > 0.0 {
        (1.0 - overrun_min / MAX_OVERRUN_MINUTES).max(0.0)
    } else {
        1.0
    }
}

/// Computes the selection score per the chosen strategy. `success` is
/// pre-multiplied by the cascading-skill confidence, if any, so a low-
/// confidence tier match never outscores a high-confidence one at equal
/// raw success.
pub fn score(strategy: ScoringStrategy, inputs: &ScoringInputs) -> f64 {
    let success = (inputs.success * inputs.skill_confidence_multiplier).clamp(0.0, 1.0);
    match strategy {
        ScoringStrategy::PureSuccess => success,
        ScoringStrategy::WeightedComposite => {
            let workload = workload_component(inputs.workload_ratio_after);
            let distance = distance_component(inputs.distance_km, inputs.max_acceptable_distance_km);
            let overrun = overrun_component(inputs.overrun_min());
            0.50 * success + 0.35 * workload + 0.10 * distance + 0.05 * overrun
        }
    }
}

fn distance_score(distance_km: Option<f64>) -> f64 {
    match distance_km {
        Some(d) => 30.0 * (-0.02 * d).exp(),
        None => 0.0,
    }
}

fn duration_score(predicted_duration_min: f64, window_minutes: f64) -> f64 {
    let diff = predicted_duration_min - window_minutes;
    if diff <= 0.0 {
        30.0 + (-diff).min(6.0)
    } else if diff <= 30.0 {
        30.0 - diff
    } else if diff <= 90.0 {
        -(diff - 30.0)
    } else {
        -60.0 - (diff - 90.0)
    }
}

/// Diagnostic 0-100ish grade (not used for candidate selection), per §4.6.
pub fn dispatch_grade(inputs: &ScoringInputs, first_time_fix: Option<bool>) -> f64 {
    let productive = 25.0 * inputs.success;
    let ftf = if first_time_fix.unwrap_or(false) { 15.0 * inputs.success } else { 0.0 };
    distance_score(inputs.distance_km) + duration_score(inputs.predicted_duration_min, inputs.window_minutes) + productive + ftf
}
