//! C7: adaptive policy. Chooses `MIN_SUCCESS_THRESHOLD` and
//! `MAX_CAPACITY_RATIO` at run start from demand, availability, and
//! time-of-day/season signals, per §4.7.

use crate::prelude::InfoLogger;

/// The three signal families scored at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Demand,
    Availability,
    Time,
}

/// Default factor priority order used to break ties among equally-scored
/// factors: `demand > availability > time`.
pub const DEFAULT_PRIORITY_ORDER: [Factor; 3] = [Factor::Demand, Factor::Availability, Factor::Time];

/// `SEASONAL_STRATEGY` (§6): which signal family, if any, drives the
/// adaptive threshold choice at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalStrategy {
    /// Scores all three factors and lets the highest-scoring one (with
    /// ties broken by `policy_priority_order`) pick the mode. The only
    /// strategy the original rule engine names explicitly.
    IntelligentAuto,
    /// Ignores the signals entirely; always resolves to `NormalDemand`'s
    /// preset, leaving `min_success_threshold`/`max_capacity_ratio`
    /// entirely to the operator's `--min-success-threshold`/
    /// `--max-capacity-ratio` overrides.
    Manual,
    /// Locks the decision to the time-of-day/season factor alone.
    TimeBased,
    /// Locks the decision to the demand-ratio factor alone.
    DemandBased,
    /// Locks the decision to the technician-availability factor alone.
    AvailabilityBased,
}

impl Default for SeasonalStrategy {
    fn default() -> Self {
        SeasonalStrategy::IntelligentAuto
    }
}

/// The operating mode selected by the policy. Doubles as the key into
/// [`SeasonalTable`]'s preset thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptiveMode {
    HighAvailability,
    LowAvailability,
    HighDemand,
    NormalDemand,
    LowDemand,
    Peak,
    Morning,
    Afternoon,
    Evening,
}

impl std::fmt::Display for AdaptiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdaptiveMode::HighAvailability => "high_availability",
            AdaptiveMode::LowAvailability => "low_availability",
            AdaptiveMode::HighDemand => "high_demand",
            AdaptiveMode::NormalDemand => "normal_demand",
            AdaptiveMode::LowDemand => "low_demand",
            AdaptiveMode::Peak => "peak",
            AdaptiveMode::Morning => "morning",
            AdaptiveMode::Afternoon => "afternoon",
            AdaptiveMode::Evening => "evening",
        };
        write!(f, "{s}")
    }
}

/// Reference `(min_success_threshold, max_capacity_ratio)` presets per
/// mode, from the §4.7 table. Operation-specific, not a universal
/// constant: a deployment may substitute its own via a different table.
#[derive(Debug, Clone, Copy)]
pub struct SeasonalTable {
    presets: [(AdaptiveMode, f64, f64); 9],
}

impl Default for SeasonalTable {
    fn default() -> Self {
        Self {
            presets: [
                (AdaptiveMode::HighAvailability, 0.35, 1.00),
                (AdaptiveMode::LowAvailability, 0.20, 1.20),
                (AdaptiveMode::HighDemand, 0.25, 1.20),
                (AdaptiveMode::NormalDemand, 0.27, 1.12),
                (AdaptiveMode::LowDemand, 0.30, 1.10),
                (AdaptiveMode::Peak, 0.25, 1.15),
                (AdaptiveMode::Morning, 0.30, 1.10),
                (AdaptiveMode::Afternoon, 0.27, 1.12),
                (AdaptiveMode::Evening, 0.25, 1.15),
            ],
        }
    }
}

impl SeasonalTable {
    pub fn preset(&self, mode: AdaptiveMode) -> (f64, f64) {
        self.presets
            .iter()
            .find(|(m, _, _)| *m == mode)
            .map(|(_, min_success, max_capacity)| (*min_success, *max_capacity))
            .unwrap_or((0.27, 1.12))
    }
}

/// Signals consulted at run start.
#[derive(Debug, Clone, Copy)]
pub struct PolicySignals {
    pub dispatch_count: usize,
    pub baseline_dispatch_count: usize,
    pub available_technician_count: usize,
    pub current_hour: u32,
    pub current_month: u32,
}

/// Thresholds chosen for the run, plus the mode they came from.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveThresholds {
    pub min_success_threshold: f64,
    pub max_capacity_ratio: f64,
    pub mode: AdaptiveMode,
}

fn demand_score(signals: &PolicySignals) -> (f64, AdaptiveMode) {
    let ratio = signals.dispatch_count as f64 / signals.baseline_dispatch_count.max(1) as f64;
    if ratio > 1.5 {
        (10.0, AdaptiveMode::HighDemand)
    } else if ratio < 0.8 {
        (8.0, AdaptiveMode::LowDemand)
    } else {
        (2.0, AdaptiveMode::NormalDemand)
    }
}

fn availability_score(signals: &PolicySignals) -> (f64, AdaptiveMode) {
    if signals.available_technician_count > 50 {
        (9.0, AdaptiveMode::HighAvailability)
    } else if signals.available_technician_count < 20 {
        (10.0, AdaptiveMode::LowAvailability)
    } else {
        (2.0, AdaptiveMode::NormalDemand)
    }
}

fn time_score(signals: &PolicySignals) -> (f64, AdaptiveMode) {
    if matches!(signals.current_month, 11 | 12 | 1) {
        return (5.0, AdaptiveMode::Peak);
    }
    match signals.current_hour {
        6..=11 => (4.0, AdaptiveMode::Morning),
        12..=17 => (4.0, AdaptiveMode::Afternoon),
        18..=21 => (4.0, AdaptiveMode::Evening),
        // Off-hours: treated like the permissive low-demand preset, since
        // §4.7's table names no distinct "low"/"normal" time preset.
        22..=23 | 0..=5 => (5.0, AdaptiveMode::LowDemand),
        _ => (4.0, AdaptiveMode::NormalDemand),
    }
}

fn choose_intelligent_auto(signals: &PolicySignals, priority_order: &[Factor]) -> (Factor, AdaptiveMode) {
    let scored = [(Factor::Demand, demand_score(signals)), (Factor::Availability, availability_score(signals)), (Factor::Time, time_score(signals))];

    let max_score = scored.iter().map(|(_, (s, _))| *s).fold(f64::MIN, f64::max);
    let eligible: Vec<_> = scored.iter().filter(|(_, (s, _))| *s > 5.0).collect();

    if eligible.is_empty() {
        return (Factor::Demand, AdaptiveMode::NormalDemand);
    }
    let tied: Vec<_> = eligible.iter().filter(|(_, (s, _))| (*s - max_score).abs() < 1e-9).collect();
    let (factor, (_, mode)) = priority_order
        .iter()
        .find_map(|wanted| tied.iter().find(|(factor, _)| factor == wanted))
        .copied()
        .unwrap_or(*tied[0]);
    (factor, mode)
}

/// Picks `(MIN_SUCCESS_THRESHOLD, MAX_CAPACITY_RATIO)` for the run and
/// logs the chosen mode, per §4.7. `strategy` selects which signal family
/// drives the decision (§6 `SEASONAL_STRATEGY`); `IntelligentAuto` is the
/// only strategy that scores all three and lets them compete.
pub fn choose_thresholds(
    signals: &PolicySignals,
    priority_order: &[Factor],
    table: &SeasonalTable,
    strategy: SeasonalStrategy,
    logger: &dyn InfoLogger,
) -> AdaptiveThresholds {
    let (factor, mode) = match strategy {
        SeasonalStrategy::IntelligentAuto => choose_intelligent_auto(signals, priority_order),
        SeasonalStrategy::Manual => (Factor::Demand, AdaptiveMode::NormalDemand),
        SeasonalStrategy::TimeBased => (Factor::Time, time_score(signals).1),
        SeasonalStrategy::DemandBased => (Factor::Demand, demand_score(signals).1),
        SeasonalStrategy::AvailabilityBased => (Factor::Availability, availability_score(signals).1),
    };

    let (min_success_threshold, max_capacity_ratio) = table.preset(mode);
    logger.log(&format!(
        "adaptive policy ({strategy:?}) selected mode={mode} via factor={factor:?} min_success_threshold={min_success_threshold} max_capacity_ratio={max_capacity_ratio}"
    ));

    AdaptiveThresholds { min_success_threshold, max_capacity_ratio, mode }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NullLogger;
    impl InfoLogger for NullLogger {
        fn log(&self, _message: &str) {}
    }

    fn base_signals() -> PolicySignals {
        PolicySignals { dispatch_count: 100, baseline_dispatch_count: 100, available_technician_count: 30, current_hour: 9, current_month: 6 }
    }

    #[test]
    fn high_demand_wins_when_ratio_exceeds_threshold() {
        let mut signals = base_signals();
        signals.dispatch_count = 200;
        let thresholds = choose_thresholds(&signals, &DEFAULT_PRIORITY_ORDER, &SeasonalTable::default(), SeasonalStrategy::IntelligentAuto, &NullLogger);
        assert_eq!(thresholds.mode, AdaptiveMode::HighDemand);
        assert_eq!(thresholds.min_success_threshold, 0.25);
    }

    #[test]
    fn low_availability_is_permissive_emergency_override() {
        let mut signals = base_signals();
        signals.available_technician_count = 5;
        let thresholds = choose_thresholds(&signals, &DEFAULT_PRIORITY_ORDER, &SeasonalTable::default(), SeasonalStrategy::IntelligentAuto, &NullLogger);
        assert_eq!(thresholds.mode, AdaptiveMode::LowAvailability);
        assert_eq!(thresholds.max_capacity_ratio, 1.20);
    }

    #[test]
    fn ties_break_by_priority_order() {
        // Demand (ratio 3.0 -> score 10) and availability (count 5 -> score 10)
        // tie; demand wins under the default priority order.
        let mut signals = base_signals();
        signals.available_technician_count = 5;
        signals.dispatch_count = 300;
        signals.baseline_dispatch_count = 100;
        let thresholds = choose_thresholds(&signals, &DEFAULT_PRIORITY_ORDER, &SeasonalTable::default(), SeasonalStrategy::IntelligentAuto, &NullLogger);
        assert_eq!(thresholds.mode, AdaptiveMode::HighDemand);
    }

    #[test]
    fn peak_month_overrides_time_of_day() {
        let mut signals = base_signals();
        signals.current_month = 12;
        signals.current_hour = 9;
        let (score, mode) = time_score(&signals);
        assert_eq!(mode, AdaptiveMode::Peak);
        assert_eq!(score, 5.0);
    }

    #[test]
    fn normal_conditions_fall_back_to_normal_demand() {
        let signals = base_signals();
        let thresholds = choose_thresholds(&signals, &DEFAULT_PRIORITY_ORDER, &SeasonalTable::default(), SeasonalStrategy::IntelligentAuto, &NullLogger);
        assert_eq!(thresholds.mode, AdaptiveMode::NormalDemand);
    }
}
