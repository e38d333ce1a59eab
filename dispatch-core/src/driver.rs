//! C10: the run driver. Wires C1-C9 together: trains the predictors,
//! chooses adaptive thresholds, scores the pre-existing baseline, runs
//! greedy assignment then post-optimization, and reports before/after
//! diagnostics, per §4.10.

use std::sync::Arc;

use chrono::{Datelike, Timelike, Utc};
use hashbrown::HashMap;

use crate::construction::{dispatch_grade, ScoringInputs};
use crate::context::{RunConfig, RunContext};
use crate::diagnostics::DecisionTrace;
use crate::error::EngineError;
use crate::models::{Assignment, CalendarEntry, Dispatch, DispatchOutcome, HistoricalDispatch, Technician, UnassignedReason};
use crate::policy::{choose_thresholds, AdaptiveThresholds, PolicySignals, SeasonalTable};
use crate::predict::{DurationPredictor, SuccessPredictor};
use crate::prelude::InfoLogger;
use crate::skill_compat::SkillCompatibilityTable;
use crate::solver::greedy::{evaluate_pair, run_greedy_traced};
use crate::solver::postopt::run_post_optimization;
use crate::solver::store::AssignmentStore;

/// Per-dispatch before/after comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchDelta {
    pub dispatch_id: String,
    pub initial_technician_id: Option<String>,
    pub initial_score: Option<f64>,
    pub optimized_technician_id: Option<String>,
    pub optimized_score: Option<f64>,
}

/// Aggregate before/after diagnostics over the whole run, per §6's
/// "Diagnostic report" output and §4.10's "aggregate diagnostics".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunDiagnostics {
    pub dispatch_count: usize,
    pub assigned_count: usize,
    pub assignment_rate: f64,
    pub mean_success: f64,
    pub mean_distance_km: f64,
    pub mean_workload_ratio: f64,
    pub mean_overrun_min: f64,
    pub mean_dispatch_grade: f64,
    /// Indexed by fallback level 0..=6.
    pub fallback_level_histogram: [usize; 7],
}

/// Everything a caller needs to export: final assignment table, decision
/// traces, deltas against the pre-existing baseline, and both sets of
/// aggregate diagnostics.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub outcomes: Vec<DispatchOutcome>,
    pub traces: Vec<DecisionTrace>,
    pub deltas: Vec<DispatchDelta>,
    pub initial_diagnostics: RunDiagnostics,
    pub optimized_diagnostics: RunDiagnostics,
    pub thresholds: AdaptiveThresholds,
    pub post_opt_passes_run: u32,
    /// `true` if the run was cancelled before every dispatch could be
    /// processed; `outcomes` still reflects everything committed so far.
    pub partial: bool,
}

fn score_preexisting<'a>(dispatches: &'a [Dispatch], calendar: &[CalendarEntry], store: &AssignmentStore, ctx: &RunContext) -> Vec<(&'a Dispatch, Option<Assignment>)> {
    dispatches
        .iter()
        .map(|d| {
            let assignment = d.assigned_technician_id.as_deref().and_then(|tid| evaluate_pair(d, tid, calendar, store, ctx));
            (d, assignment)
        })
        .collect()
}

fn summarize(pairs: &[(&Dispatch, Option<Assignment>)], max_acceptable_distance_km: f64) -> RunDiagnostics {
    let total = pairs.len();
    let mut diagnostics = RunDiagnostics { dispatch_count: total, ..Default::default() };

    let mut success_sum = 0.0;
    let mut distance_sum = 0.0;
    let mut distance_count = 0usize;
    let mut workload_sum = 0.0;
    let mut overrun_sum = 0.0;
    let mut grade_sum = 0.0;

    for (dispatch, assignment) in pairs {
        let Some(a) = assignment else { continue };
        diagnostics.assigned_count += 1;
        success_sum += a.predicted_success;
        if let Some(d) = a.distance_km {
            distance_sum += d;
            distance_count += 1;
        }
        workload_sum += a.workload_ratio_after;
        overrun_sum += (a.predicted_duration - dispatch.window_minutes()).max(0.0);

        let scoring_inputs = ScoringInputs {
            success: a.predicted_success,
            skill_confidence_multiplier: 1.0,
            distance_km: a.distance_km,
            workload_ratio_after: a.workload_ratio_after,
            predicted_duration_min: a.predicted_duration,
            window_minutes: dispatch.window_minutes(),
            max_acceptable_distance_km,
        };
        grade_sum += dispatch_grade(&scoring_inputs, dispatch.first_time_fix);
        diagnostics.fallback_level_histogram[a.fallback_level.0 as usize] += 1;
    }

    diagnostics.assignment_rate = diagnostics.assigned_count as f64 / total.max(1) as f64;
    if diagnostics.assigned_count > 0 {
        let assigned = diagnostics.assigned_count as f64;
        diagnostics.mean_success = success_sum / assigned;
        diagnostics.mean_workload_ratio = workload_sum / assigned;
        diagnostics.mean_overrun_min = overrun_sum / assigned;
        diagnostics.mean_dispatch_grade = grade_sum / assigned;
    }
    if distance_count > 0 {
        diagnostics.mean_distance_km = distance_sum / distance_count as f64;
    }
    diagnostics
}

/// Runs one full optimization pass: trains C2-C4 from `history`, picks
/// adaptive thresholds (C7), scores the pre-existing baseline, then runs
/// greedy assignment (C8) and post-optimization (C9).
///
/// Training never produces an `EngineError`: an undersized history falls
/// back to `SuccessMode::Fallback` automatically (§4.3/§7's "downgrade to
/// logistic" path), since the engine has no separate "enhanced" model
/// family to fail out of in the first place.
pub fn run(
    dispatches: &[Dispatch],
    technicians: Vec<Technician>,
    calendar: &[CalendarEntry],
    history: &[HistoricalDispatch],
    config: RunConfig,
    logger: Arc<dyn InfoLogger>,
) -> Result<RunResult, EngineError> {
    if dispatches.is_empty() {
        return Err(EngineError::Ingest("no dispatches to schedule".into()));
    }
    if technicians.is_empty() {
        return Err(EngineError::Ingest("no technicians available".into()));
    }

    let skill_table = SkillCompatibilityTable::train(history);
    let (success_predictor, success_warnings) = SuccessPredictor::train(history, &skill_table);
    for warning in &success_warnings {
        logger.log(&format!("success predictor training: {warning}"));
    }
    let duration_predictor = DurationPredictor::train(history, &skill_table, logger.as_ref());
    let seasonal_table = SeasonalTable::default();

    let now = Utc::now();
    let signals = PolicySignals {
        dispatch_count: dispatches.len(),
        baseline_dispatch_count: history.len().max(dispatches.len()),
        available_technician_count: technicians.iter().filter(|t| t.workload_ratio() < 1.0).count(),
        current_hour: now.hour(),
        current_month: now.month(),
    };
    let policy_priority_order = config.policy_priority_order.clone();
    let mut thresholds = choose_thresholds(&signals, &policy_priority_order, &seasonal_table, config.seasonal_strategy, logger.as_ref());
    if let Some(min_success) = config.min_success_threshold_override {
        logger.log(&format!("overriding adaptive min_success_threshold={} with configured {min_success}", thresholds.min_success_threshold));
        thresholds.min_success_threshold = min_success;
    }
    if let Some(max_capacity) = config.max_capacity_ratio_override {
        logger.log(&format!("overriding adaptive max_capacity_ratio={} with configured {max_capacity}", thresholds.max_capacity_ratio));
        thresholds.max_capacity_ratio = max_capacity;
    }

    let ctx = RunContext::new(config, thresholds, skill_table, success_predictor, duration_predictor, seasonal_table, Arc::clone(&logger));

    let mut store = AssignmentStore::new(technicians);

    let initial_pairs = score_preexisting(dispatches, calendar, &store, &ctx);
    let initial_diagnostics = summarize(&initial_pairs, ctx.config.max_acceptable_distance_km);
    let initial_by_id: HashMap<&str, Option<Assignment>> = initial_pairs.iter().map(|(d, a)| (d.dispatch_id.as_str(), a.clone())).collect();

    let traces = run_greedy_traced(dispatches, calendar, &mut store, &ctx);
    let post_opt_passes_run = if ctx.is_aborted() { 0 } else { run_post_optimization(dispatches, calendar, &mut store, &ctx) };
    let partial = ctx.is_aborted();

    if !store.counters_are_consistent() {
        let dump = store.dump_state();
        logger.log(&format!("hard constraint violated; dumping assignment store state:\n{dump}"));
        return Err(EngineError::HardConstraintViolated(format!(
            "technician assignment counters diverged from the committed assignment table\n{dump}"
        )));
    }

    let final_pairs: Vec<(&Dispatch, Option<Assignment>)> = dispatches.iter().map(|d| (d, store.assignment(&d.dispatch_id).cloned())).collect();
    let optimized_diagnostics = summarize(&final_pairs, ctx.config.max_acceptable_distance_km);

    let outcomes: Vec<DispatchOutcome> = dispatches
        .iter()
        .map(|d| match store.assignment(&d.dispatch_id) {
            Some(a) => DispatchOutcome::Assigned(a.clone()),
            None => {
                let reason = traces
                    .iter()
                    .find(|t| t.dispatch_id == d.dispatch_id)
                    .and_then(|t| match &t.outcome {
                        DispatchOutcome::Unassigned { reason, .. } => Some(*reason),
                        DispatchOutcome::Assigned(_) => None,
                    })
                    .unwrap_or(UnassignedReason::BelowThreshold);
                DispatchOutcome::Unassigned { dispatch_id: d.dispatch_id.clone(), reason }
            }
        })
        .collect();

    let deltas: Vec<DispatchDelta> = dispatches
        .iter()
        .map(|d| {
            let initial = initial_by_id.get(d.dispatch_id.as_str()).cloned().flatten();
            let optimized = store.assignment(&d.dispatch_id).cloned();
            DispatchDelta {
                dispatch_id: d.dispatch_id.clone(),
                initial_technician_id: initial.as_ref().map(|a| a.technician_id.clone()),
                initial_score: initial.as_ref().map(|a| a.score),
                optimized_technician_id: optimized.as_ref().map(|a| a.technician_id.clone()),
                optimized_score: optimized.as_ref().map(|a| a.score),
            }
        })
        .collect();

    Ok(RunResult { outcomes, traces, deltas, initial_diagnostics, optimized_diagnostics, thresholds, post_opt_passes_run, partial })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalendarEntry, Priority};
    use chrono::TimeZone;

    #[derive(Debug)]
    struct RecordingLogger(std::sync::Mutex<Vec<String>>);
    impl InfoLogger for RecordingLogger {
        fn log(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn tech(id: &str) -> Technician {
        Technician {
            technician_id: id.into(),
            primary_skill: "fiber".into(),
            tech_lat: Some(40.01),
            tech_lon: Some(-74.01),
            city: Some("Newark".into()),
            state: "NJ".into(),
            workload_capacity: 8,
            current_assignments: 0,
        }
    }

    fn dispatch(id: &str, hour: u32) -> Dispatch {
        Dispatch {
            dispatch_id: id.into(),
            priority: Priority::Normal,
            required_skill: "fiber".into(),
            service_tier: None,
            equipment_installed: None,
            first_time_fix: None,
            appointment_start: Utc.with_ymd_and_hms(2026, 3, 5, hour, 0, 0).unwrap(),
            appointment_end: Utc.with_ymd_and_hms(2026, 3, 5, hour + 1, 0, 0).unwrap(),
            customer_lat: Some(40.0),
            customer_lon: Some(-74.0),
            city: Some("Newark".into()),
            state: "NJ".into(),
            expected_duration_min: 60.0,
            assigned_technician_id: None,
        }
    }

    fn calendar_entry(tech_id: &str) -> CalendarEntry {
        CalendarEntry {
            technician_id: tech_id.into(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
            available: true,
            shift_start: chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            shift_end: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            max_assignments: 5,
        }
    }

    #[test]
    fn empty_dispatches_is_an_ingest_error() {
        let logger = Arc::new(RecordingLogger(std::sync::Mutex::new(Vec::new())));
        let result = run(&[], vec![tech("t1")], &[], &[], RunConfig::default(), logger);
        assert!(matches!(result, Err(EngineError::Ingest(_))));
    }

    #[test]
    fn full_run_assigns_and_reports_diagnostics() {
        let logger = Arc::new(RecordingLogger(std::sync::Mutex::new(Vec::new())));
        let dispatches = vec![dispatch("d1", 9), dispatch("d2", 10)];
        let cal = vec![calendar_entry("t1")];
        let result = run(&dispatches, vec![tech("t1")], &cal, &[], RunConfig::default(), logger).unwrap();

        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.optimized_diagnostics.dispatch_count, 2);
        assert!(result.optimized_diagnostics.assignment_rate > 0.0);
        assert_eq!(result.deltas.len(), 2);
        assert!(!result.partial);
    }

    #[test]
    fn preexisting_assignment_seeds_initial_diagnostics() {
        let logger = Arc::new(RecordingLogger(std::sync::Mutex::new(Vec::new())));
        let mut d1 = dispatch("d1", 9);
        d1.assigned_technician_id = Some("t1".into());
        let cal = vec![calendar_entry("t1")];
        let result = run(std::slice::from_ref(&d1), vec![tech("t1")], &cal, &[], RunConfig::default(), logger).unwrap();

        assert_eq!(result.initial_diagnostics.assigned_count, 1);
        let delta = &result.deltas[0];
        assert_eq!(delta.initial_technician_id.as_deref(), Some("t1"));
    }
}
