//! C8: priority-ordered greedy assignment with the progressive fallback
//! relaxation ladder, per §4.8.

use crate::construction::{find_candidates, overlaps, priority_exception_delta, score, CandidateFilterConfig, ScoringInputs};
use crate::context::RunContext;
use crate::diagnostics::{DecisionTrace, RejectedCandidate, TOP_REJECTED_CANDIDATES};
use crate::geo::distance_km;
use crate::models::{Assignment, CalendarEntry, Dispatch, DispatchOutcome, FallbackLevel, Technician, UnassignedReason};
use crate::predict::{DurationFeatureInputs, SuccessFeatureInputs};
use crate::solver::store::AssignmentStore;

struct LevelParams {
    overlap_buffer_min: i64,
    max_concurrent: u32,
    allow_overtime: bool,
    capacity_ratio_cap: f64,
    priority_exception: bool,
}

fn level_params(level: FallbackLevel, base_overlap_min: i64, adaptive_max_capacity_ratio: f64) -> LevelParams {
    match level.0 {
        0 => LevelParams { overlap_buffer_min: base_overlap_min, max_concurrent: 2, allow_overtime: false, capacity_ratio_cap: 1.0, priority_exception: true },
        1 => LevelParams { overlap_buffer_min: 15, max_concurrent: 2, allow_overtime: false, capacity_ratio_cap: 1.0, priority_exception: true },
        2 => LevelParams { overlap_buffer_min: 0, max_concurrent: 2, allow_overtime: false, capacity_ratio_cap: 1.0, priority_exception: true },
        3 => LevelParams { overlap_buffer_min: 0, max_concurrent: 3, allow_overtime: false, capacity_ratio_cap: 1.0, priority_exception: false },
        4 => LevelParams { overlap_buffer_min: 0, max_concurrent: 3, allow_overtime: true, capacity_ratio_cap: 1.0, priority_exception: false },
        5 => LevelParams { overlap_buffer_min: 0, max_concurrent: 3, allow_overtime: true, capacity_ratio_cap: adaptive_max_capacity_ratio.min(1.10), priority_exception: false },
        _ => LevelParams { overlap_buffer_min: 0, max_concurrent: u32::MAX, allow_overtime: true, capacity_ratio_cap: f64::INFINITY, priority_exception: false },
    }
}

fn shift_entry<'a>(calendar: &'a [CalendarEntry], technician_id: &str, dispatch: &Dispatch) -> Option<&'a CalendarEntry> {
    let date = dispatch.date();
    calendar.iter().find(|e| e.technician_id == technician_id && e.date == date && e.available && e.has_valid_shift())
}

/// Sorts dispatches by `(priority_rank, appointment_start)`, the order the
/// greedy loop must process them in.
pub fn order_dispatches(dispatches: &[Dispatch]) -> Vec<&Dispatch> {
    let mut ordered: Vec<&Dispatch> = dispatches.iter().collect();
    ordered.sort_by(|a, b| (a.priority.rank(), a.appointment_start).cmp(&(b.priority.rank(), b.appointment_start)));
    ordered
}

struct ScoredCandidate<'a> {
    technician: &'a Technician,
    distance_km: Option<f64>,
    success: f64,
    predicted_duration: f64,
    skill_match_score: f64,
    score: f64,
    warnings: Vec<String>,
    is_clean: bool,
}

#[allow(clippy::too_many_arguments)]
fn build_scored_candidates<'a>(
    dispatch: &Dispatch,
    calendar: &[CalendarEntry],
    store: &'a AssignmentStore,
    ctx: &RunContext,
    level: FallbackLevel,
    params: &LevelParams,
) -> Vec<ScoredCandidate<'a>> {
    let mut config = ctx.base_candidate_config();
    config.max_capacity_ratio = params.capacity_ratio_cap;

    let candidates = find_candidates(dispatch, store.technicians(), calendar, &ctx.skill_table, &config);

    let mut best_non_overlap_success: f64 = f64::MIN;
    let mut scored_with_overlap_flag: Vec<(ScoredCandidate, bool)> = Vec::new();

    for candidate in candidates {
        let Some(entry) = shift_entry(calendar, &candidate.technician.technician_id, dispatch) else {
            continue;
        };

        let mut warnings = Vec::new();

        if candidate.technician.workload_ratio_after(1) > 1.0 {
            warnings.push(format!("allowing {:.0}% workload", candidate.technician.workload_ratio_after(1) * 100.0));
        }

        let overtime = dispatch.appointment_end.time() > entry.shift_end;
        if overtime && !params.allow_overtime {
            continue;
        }
        if overtime {
            warnings.push("end_of_shift_overtime".to_string());
        }

        let existing: Vec<_> = store
            .assignments_for_technician(&candidate.technician.technician_id)
            .filter(|a| overlaps(dispatch.appointment_start, dispatch.appointment_end, a.start, a.end, params.overlap_buffer_min))
            .collect();
        let has_overlap = !existing.is_empty();
        if has_overlap && existing.len() as u32 >= params.max_concurrent {
            continue;
        }
        if has_overlap && params.overlap_buffer_min < 30 {
            warnings.push(format!("overlap_buffer_relaxed_to_{}min", params.overlap_buffer_min));
        }

        let success_inputs = SuccessFeatureInputs {
            distance_km: candidate.distance_km,
            skill_match_score: candidate.skill_match_score,
            workload_ratio: candidate.workload_ratio,
            hour_of_day: dispatch_hour(dispatch),
            day_of_week: dispatch_day(dispatch),
            is_weekend: dispatch_is_weekend(dispatch),
            first_time_fix: dispatch.first_time_fix,
            service_tier: dispatch.service_tier.as_deref(),
            equipment_installed: dispatch.equipment_installed,
            priority: dispatch.priority,
        };
        let raw_success =
            ctx.success_predictor
                .predict_hybrid(&success_inputs, &candidate.technician.technician_id, ctx.config.enable_hybrid_scoring, ctx.config.rule_weight);
        let success = (raw_success * candidate.skill_confidence_multiplier.clamp(0.0, 1.0)).clamp(0.0, 1.0);

        if !has_overlap {
            best_non_overlap_success = best_non_overlap_success.max(success);
        }

        let duration_inputs = DurationFeatureInputs {
            distance_km: candidate.distance_km,
            skill_match_score: candidate.skill_match_score,
            workload_ratio: candidate.workload_ratio,
            hour_of_day: dispatch_hour(dispatch),
            day_of_week: dispatch_day(dispatch),
            is_weekend: dispatch_is_weekend(dispatch),
            first_time_fix: dispatch.first_time_fix,
            service_tier: dispatch.service_tier.as_deref(),
            equipment_installed: dispatch.equipment_installed,
            technician_id: &candidate.technician.technician_id,
            city: dispatch.city.as_deref(),
        };
        let predicted_duration = ctx.duration_predictor.predict(&duration_inputs);

        let scoring_inputs = ScoringInputs {
            success,
            skill_confidence_multiplier: 1.0,
            distance_km: candidate.distance_km,
            workload_ratio_after: candidate.technician.workload_ratio_after(1),
            predicted_duration_min: predicted_duration,
            window_minutes: dispatch.window_minutes(),
            max_acceptable_distance_km: ctx.config.max_acceptable_distance_km,
        };
        let final_score = score(ctx.config.scoring_strategy, &scoring_inputs);

        if ctx.thresholds.min_success_threshold > 0.0 && success < ctx.thresholds.min_success_threshold {
            continue;
        }

        let is_clean = warnings.is_empty();
        scored_with_overlap_flag.push((
            ScoredCandidate {
                technician: candidate.technician,
                distance_km: candidate.distance_km,
                success,
                predicted_duration,
                skill_match_score: candidate.skill_match_score,
                score: final_score,
                warnings,
                is_clean,
            },
            has_overlap,
        ));
    }

    let exception_delta = if params.priority_exception { priority_exception_delta(dispatch.priority) } else { None };

    let mut kept: Vec<ScoredCandidate> = Vec::new();
    for (mut candidate, has_overlap) in scored_with_overlap_flag {
        if has_overlap {
            match exception_delta {
                Some(delta) if candidate.success - best_non_overlap_success >= delta => {
                    candidate.warnings.push("priority_exception_overlap".to_string());
                    candidate.is_clean = false;
                    kept.push(candidate);
                }
                _ => continue,
            }
        } else {
            kept.push(candidate);
        }
    }

    kept.sort_by(|a, b| {
        b.is_clean
            .cmp(&a.is_clean)
            .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.distance_km.partial_cmp(&b.distance_km).unwrap_or(std::cmp::Ordering::Equal))
    });
    kept
}

fn dispatch_hour(dispatch: &Dispatch) -> u32 {
    use chrono::Timelike;
    dispatch.appointment_start.hour()
}

fn dispatch_day(dispatch: &Dispatch) -> u32 {
    use chrono::Datelike;
    dispatch.appointment_start.weekday().num_days_from_monday()
}

fn dispatch_is_weekend(dispatch: &Dispatch) -> bool {
    dispatch_day(dispatch) >= 5
}

fn classify_unassigned(dispatch: &Dispatch, calendar: &[CalendarEntry], technicians: &[Technician], max_distance: f64) -> UnassignedReason {
    let date = dispatch.date();
    if !calendar.iter().any(|e| e.date == date && e.available) {
        return UnassignedReason::NoCalendar;
    }
    let any_in_city = technicians.iter().any(|t| t.city.as_deref().zip(dispatch.city.as_deref()).map(|(a, b)| a.eq_ignore_ascii_case(b)).unwrap_or(false));
    if !any_in_city {
        return UnassignedReason::NoCityTech;
    }
    let any_within_distance = technicians
        .iter()
        .any(|t| distance_km(dispatch.customer_lat, dispatch.customer_lon, t.tech_lat, t.tech_lon).map(|d| d <= max_distance).unwrap_or(false));
    if !any_within_distance {
        return UnassignedReason::DistanceFilter;
    }
    let any_under_capacity = technicians.iter().any(|t| t.workload_ratio() < 1.20);
    if !any_under_capacity {
        return UnassignedReason::AllOvercap;
    }
    UnassignedReason::BelowThreshold
}

/// Attempts to place `dispatch`, escalating through L0..=L6 until a
/// candidate is found or the ladder is exhausted.
pub fn assign_one(dispatch: &Dispatch, calendar: &[CalendarEntry], store: &mut AssignmentStore, ctx: &RunContext) -> DispatchOutcome {
    assign_one_traced(dispatch, calendar, store, ctx).outcome
}

/// Same as [`assign_one`] but also returns the decision trace (chosen
/// candidate, top rejected candidates, fallback level reached) for C10's
/// run driver to retain for offline analysis.
pub fn assign_one_traced(dispatch: &Dispatch, calendar: &[CalendarEntry], store: &mut AssignmentStore, ctx: &RunContext) -> DecisionTrace {
    let mut level = FallbackLevel::L0;
    loop {
        let params = level_params(level, ctx.config.overlap_buffer_min_l0, ctx.thresholds.max_capacity_ratio);
        let mut candidates = build_scored_candidates(dispatch, calendar, store, ctx, level, &params);

        if !candidates.is_empty() {
            let winner = candidates.remove(0);
            let rejected = candidates
                .iter()
                .take(TOP_REJECTED_CANDIDATES)
                .map(|c| RejectedCandidate { technician_id: c.technician.technician_id.clone(), score: c.score, distance_km: c.distance_km })
                .collect();

            let assignment = Assignment {
                dispatch_id: dispatch.dispatch_id.clone(),
                technician_id: winner.technician.technician_id.clone(),
                start: dispatch.appointment_start,
                end: dispatch.appointment_end,
                predicted_success: winner.success,
                predicted_duration: winner.predicted_duration,
                distance_km: winner.distance_km,
                skill_match_score: winner.skill_match_score,
                workload_ratio_after: winner.technician.workload_ratio_after(1),
                score: winner.score,
                warnings: winner.warnings,
                fallback_level: level,
            };
            store.assign(assignment.clone());
            return DecisionTrace {
                dispatch_id: dispatch.dispatch_id.clone(),
                outcome: DispatchOutcome::Assigned(assignment),
                fallback_level_reached: level,
                rejected,
            };
        }

        match level.next() {
            Some(next) => level = next,
            None => {
                let reason = classify_unassigned(dispatch, calendar, store.technicians(), ctx.config.max_acceptable_distance_km);
                return DecisionTrace {
                    dispatch_id: dispatch.dispatch_id.clone(),
                    outcome: DispatchOutcome::Unassigned { dispatch_id: dispatch.dispatch_id.clone(), reason },
                    fallback_level_reached: level,
                    rejected: Vec::new(),
                };
            }
        }
    }
}

/// Evaluates a single `(dispatch, technician)` pair outside the ladder, for
/// C9's reassignment and swap passes. Checks hard constraints (calendar,
/// distance) plus the L0 overlap/capacity defaults; returns `None` if the
/// pair is infeasible.
pub(crate) fn evaluate_pair(dispatch: &Dispatch, technician_id: &str, calendar: &[CalendarEntry], store: &AssignmentStore, ctx: &RunContext) -> Option<Assignment> {
    let technician = store.technician(technician_id)?;
    let entry = shift_entry(calendar, technician_id, dispatch)?;

    let distance_km = distance_km(dispatch.customer_lat, dispatch.customer_lon, technician.tech_lat, technician.tech_lon);
    if distance_km.map(|d| d > ctx.config.max_acceptable_distance_km).unwrap_or(true) {
        return None;
    }

    let overtime = dispatch.appointment_end.time() > entry.shift_end;
    let mut warnings = Vec::new();
    if overtime {
        warnings.push("end_of_shift_overtime".to_string());
    }
    if technician.workload_ratio_after(1) > 1.0 {
        warnings.push(format!("allowing {:.0}% workload", technician.workload_ratio_after(1) * 100.0));
    }

    let overlapping = store
        .assignments_for_technician(technician_id)
        .filter(|a| a.dispatch_id != dispatch.dispatch_id)
        .filter(|a| overlaps(dispatch.appointment_start, dispatch.appointment_end, a.start, a.end, 30))
        .count();
    if overlapping >= 2 {
        return None;
    }
    if overlapping > 0 {
        warnings.push("overlap_buffer_relaxed_to_0min".to_string());
    }

    if technician.workload_ratio_after(1) >= 1.20 {
        return None;
    }

    let skill_match_score = ctx.skill_table.score(&dispatch.required_skill, &technician.primary_skill);
    let success_inputs = SuccessFeatureInputs {
        distance_km,
        skill_match_score,
        workload_ratio: technician.workload_ratio(),
        hour_of_day: dispatch_hour(dispatch),
        day_of_week: dispatch_day(dispatch),
        is_weekend: dispatch_is_weekend(dispatch),
        first_time_fix: dispatch.first_time_fix,
        service_tier: dispatch.service_tier.as_deref(),
        equipment_installed: dispatch.equipment_installed,
        priority: dispatch.priority,
    };
    let success = ctx
        .success_predictor
        .predict_hybrid(&success_inputs, technician_id, ctx.config.enable_hybrid_scoring, ctx.config.rule_weight)
        .clamp(0.0, 1.0);

    let duration_inputs = DurationFeatureInputs {
        distance_km,
        skill_match_score,
        workload_ratio: technician.workload_ratio(),
        hour_of_day: dispatch_hour(dispatch),
        day_of_week: dispatch_day(dispatch),
        is_weekend: dispatch_is_weekend(dispatch),
        first_time_fix: dispatch.first_time_fix,
        service_tier: dispatch.service_tier.as_deref(),
        equipment_installed: dispatch.equipment_installed,
        technician_id,
        city: dispatch.city.as_deref(),
    };
    let predicted_duration = ctx.duration_predictor.predict(&duration_inputs);

    let scoring_inputs = ScoringInputs {
        success,
        skill_confidence_multiplier: 1.0,
        distance_km,
        workload_ratio_after: technician.workload_ratio_after(1),
        predicted_duration_min: predicted_duration,
        window_minutes: dispatch.window_minutes(),
        max_acceptable_distance_km: ctx.config.max_acceptable_distance_km,
    };
    let final_score = score(ctx.config.scoring_strategy, &scoring_inputs);

    Some(Assignment {
        dispatch_id: dispatch.dispatch_id.clone(),
        technician_id: technician_id.to_string(),
        start: dispatch.appointment_start,
        end: dispatch.appointment_end,
        predicted_success: success,
        predicted_duration,
        distance_km,
        skill_match_score,
        workload_ratio_after: technician.workload_ratio_after(1),
        score: final_score,
        warnings,
        fallback_level: FallbackLevel::L0,
    })
}

/// Re-scores `dispatch` against the whole pool at L0 only, for C9's
/// reassignment pass.
pub(crate) fn best_candidate_l0(dispatch: &Dispatch, calendar: &[CalendarEntry], store: &AssignmentStore, ctx: &RunContext) -> Option<Assignment> {
    let params = level_params(FallbackLevel::L0, ctx.config.overlap_buffer_min_l0, ctx.thresholds.max_capacity_ratio);
    build_scored_candidates(dispatch, calendar, store, ctx, FallbackLevel::L0, &params).into_iter().next().map(|c| Assignment {
        dispatch_id: dispatch.dispatch_id.clone(),
        technician_id: c.technician.technician_id.clone(),
        start: dispatch.appointment_start,
        end: dispatch.appointment_end,
        predicted_success: c.success,
        predicted_duration: c.predicted_duration,
        distance_km: c.distance_km,
        skill_match_score: c.skill_match_score,
        workload_ratio_after: c.technician.workload_ratio_after(1),
        score: c.score,
        warnings: c.warnings,
        fallback_level: FallbackLevel::L0,
    })
}

/// Runs the full greedy pass over every dispatch in priority order.
pub fn run_greedy(dispatches: &[Dispatch], calendar: &[CalendarEntry], store: &mut AssignmentStore, ctx: &RunContext) -> Vec<DispatchOutcome> {
    run_greedy_traced(dispatches, calendar, store, ctx).into_iter().map(|t| t.outcome).collect()
}

/// Same as [`run_greedy`] but retains the full decision trace per dispatch.
pub fn run_greedy_traced(dispatches: &[Dispatch], calendar: &[CalendarEntry], store: &mut AssignmentStore, ctx: &RunContext) -> Vec<DecisionTrace> {
    let ordered = order_dispatches(dispatches);
    let mut traces = Vec::with_capacity(ordered.len());
    for dispatch in ordered {
        if ctx.is_aborted() {
            break;
        }
        traces.push(assign_one_traced(dispatch, calendar, store, ctx));
    }
    traces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunConfig, RunContext};
    use crate::models::Priority;
    use crate::policy::{AdaptiveMode, AdaptiveThresholds, SeasonalTable};
    use crate::predict::{DurationPredictor, SuccessPredictor};
    use crate::prelude::InfoLogger;
    use crate::skill_compat::SkillCompatibilityTable;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[derive(Debug)]
    struct NullLogger;
    impl InfoLogger for NullLogger {
        fn log(&self, _message: &str) {}
    }

    fn test_context(config: RunConfig) -> RunContext {
        let table = SkillCompatibilityTable::empty();
        let (success, _) = SuccessPredictor::train(&[], &table);
        let duration = DurationPredictor::train(&[], &table, &NullLogger);
        let thresholds = AdaptiveThresholds { min_success_threshold: 0.0, max_capacity_ratio: 1.12, mode: AdaptiveMode::NormalDemand };
        RunContext::new(config, thresholds, table, success, duration, SeasonalTable::default(), Arc::new(NullLogger))
    }

    fn dispatch(id: &str, priority: Priority, hour: u32) -> Dispatch {
        Dispatch {
            dispatch_id: id.into(),
            priority,
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

    fn tech(id: &str) -> Technician {
        Technician {
            technician_id: id.into(),
            primary_skill: "fiber".into(),
            tech_lat: Some(40.001),
            tech_lon: Some(-74.001),
            city: Some("Newark".into()),
            state: "NJ".into(),
            workload_capacity: 8,
            current_assignments: 0,
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
    fn orders_critical_before_low() {
        let dispatches = vec![dispatch("low", Priority::Low, 9), dispatch("crit", Priority::Critical, 10)];
        let ordered = order_dispatches(&dispatches);
        assert_eq!(ordered[0].dispatch_id, "crit");
    }

    #[test]
    fn assigns_a_clean_candidate_at_l0() {
        let ctx = test_context(RunConfig::default());
        let mut store = AssignmentStore::new(vec![tech("t1")]);
        let cal = vec![calendar_entry("t1")];
        let d = dispatch("d1", Priority::Normal, 9);
        let outcome = assign_one(&d, &cal, &mut store, &ctx);
        match outcome {
            DispatchOutcome::Assigned(a) => {
                assert_eq!(a.technician_id, "t1");
                assert_eq!(a.fallback_level, FallbackLevel::L0);
            }
            DispatchOutcome::Unassigned { reason, .. } => panic!("expected assignment, got {reason}"),
        }
    }

    #[test]
    fn no_calendar_entry_yields_unassigned_with_reason() {
        let ctx = test_context(RunConfig::default());
        let mut store = AssignmentStore::new(vec![tech("t1")]);
        let d = dispatch("d1", Priority::Normal, 9);
        let outcome = assign_one(&d, &[], &mut store, &ctx);
        assert!(matches!(outcome, DispatchOutcome::Unassigned { reason: UnassignedReason::NoCalendar, .. }));
    }

    #[test]
    fn second_overlapping_dispatch_escalates_past_l0() {
        let ctx = test_context(RunConfig::default());
        let mut store = AssignmentStore::new(vec![tech("t1")]);
        let cal = vec![calendar_entry("t1")];
        let d1 = dispatch("d1", Priority::Normal, 9);
        let d2 = dispatch("d2", Priority::Normal, 9);
        assign_one(&d1, &cal, &mut store, &ctx);
        let outcome = assign_one(&d2, &cal, &mut store, &ctx);
        assert!(matches!(outcome, DispatchOutcome::Assigned(_)));
    }

    #[test]
    fn full_greedy_pass_preserves_counter_invariant() {
        let ctx = test_context(RunConfig::default());
        let mut store = AssignmentStore::new(vec![tech("t1"), tech("t2")]);
        let cal = vec![calendar_entry("t1"), calendar_entry("t2")];
        let dispatches = vec![dispatch("d1", Priority::Critical, 9), dispatch("d2", Priority::Normal, 10)];
        run_greedy(&dispatches, &cal, &mut store, &ctx);
        assert!(store.counters_are_consistent());
    }
}
