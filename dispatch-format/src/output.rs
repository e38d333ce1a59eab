//! Output tables and report (§6): the per-dispatch assignment table, the
//! optional per-warning table, and the plain-text diagnostic report.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use dispatch_core::models::DispatchOutcome;
use dispatch_core::RunResult;
use serde::{Deserialize, Serialize};

/// One row of the Assignment table (§6). `fallback_level` is `None` for an
/// unassigned dispatch, since no ladder step was ultimately committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub dispatch_id: String,
    pub optimized_technician_id: Option<String>,
    pub predicted_success: Option<f64>,
    pub predicted_duration_min: Option<f64>,
    pub distance_km: Option<f64>,
    pub skill_match_score: Option<f64>,
    pub workload_ratio: Option<f64>,
    pub score: Option<f64>,
    pub fallback_level: Option<u8>,
    pub warnings: String,
    pub optimization_timestamp: DateTime<Utc>,
}

/// One row of the optional Warnings table: one row per warning string,
/// unlike `AssignmentRow::warnings`, which joins them for the main table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRow {
    pub dispatch_id: String,
    pub technician_id: String,
    pub warning_text: String,
}

/// Builds the Assignment table from a run's final outcomes.
pub fn assignment_rows(outcomes: &[DispatchOutcome], optimization_timestamp: DateTime<Utc>) -> Vec<AssignmentRow> {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            DispatchOutcome::Assigned(a) => AssignmentRow {
                dispatch_id: a.dispatch_id.clone(),
                optimized_technician_id: Some(a.technician_id.clone()),
                predicted_success: Some(a.predicted_success),
                predicted_duration_min: Some(a.predicted_duration),
                distance_km: a.distance_km,
                skill_match_score: Some(a.skill_match_score),
                workload_ratio: Some(a.workload_ratio_after),
                score: Some(a.score),
                fallback_level: Some(a.fallback_level.0),
                warnings: a.warnings.join("; "),
                optimization_timestamp,
            },
            DispatchOutcome::Unassigned { dispatch_id, reason } => AssignmentRow {
                dispatch_id: dispatch_id.clone(),
                optimized_technician_id: None,
                predicted_success: None,
                predicted_duration_min: None,
                distance_km: None,
                skill_match_score: None,
                workload_ratio: None,
                score: None,
                fallback_level: None,
                warnings: reason.to_string(),
                optimization_timestamp,
            },
        })
        .collect()
}

/// Builds the optional per-warning table from a run's final outcomes.
pub fn warning_rows(outcomes: &[DispatchOutcome]) -> Vec<WarningRow> {
    outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            DispatchOutcome::Assigned(a) => Some(a),
            DispatchOutcome::Unassigned { .. } => None,
        })
        .flat_map(|a| {
            a.warnings.iter().map(|warning_text| WarningRow {
                dispatch_id: a.dispatch_id.clone(),
                technician_id: a.technician_id.clone(),
                warning_text: warning_text.clone(),
            })
        })
        .collect()
}

/// Renders the §6 diagnostic report: before/after means plus the
/// fallback-level histogram, as a plain-text block. No template engine,
/// matching how small a job this is.
pub fn render_diagnostic_report(result: &RunResult) -> String {
    let mut out = String::new();
    let before = &result.initial_diagnostics;
    let after = &result.optimized_diagnostics;

    writeln!(out, "Dispatch Optimization Report").ok();
    writeln!(out, "============================").ok();
    writeln!(out, "dispatches: {}", after.dispatch_count).ok();
    writeln!(out, "adaptive mode: {} (min_success={:.2} max_capacity={:.2})", result.thresholds.mode, result.thresholds.min_success_threshold, result.thresholds.max_capacity_ratio).ok();
    writeln!(out, "post-optimization passes run: {}", result.post_opt_passes_run).ok();
    if result.partial {
        writeln!(out, "WARNING: run was cancelled; results reflect a partial pass").ok();
    }
    writeln!(out).ok();

    writeln!(out, "{:<22}{:>12}{:>12}", "metric", "before", "after").ok();
    let row = |out: &mut String, label: &str, b: f64, a: f64| {
        writeln!(out, "{label:<22}{b:>12.4}{a:>12.4}").ok();
    };
    row(&mut out, "assignment_rate", before.assignment_rate, after.assignment_rate);
    row(&mut out, "mean_success", before.mean_success, after.mean_success);
    row(&mut out, "mean_distance_km", before.mean_distance_km, after.mean_distance_km);
    row(&mut out, "mean_workload_ratio", before.mean_workload_ratio, after.mean_workload_ratio);
    row(&mut out, "mean_overrun_min", before.mean_overrun_min, after.mean_overrun_min);
    row(&mut out, "mean_dispatch_grade", before.mean_dispatch_grade, after.mean_dispatch_grade);

    writeln!(out).ok();
    writeln!(out, "fallback-level histogram (after optimization):").ok();
    for (level, count) in after.fallback_level_histogram.iter().enumerate() {
        writeln!(out, "  L{level}: {count}").ok();
    }

    out
}
