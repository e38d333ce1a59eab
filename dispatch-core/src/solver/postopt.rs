//! C9: post-optimization reassignment and swap passes, per §4.9. Runs after
//! the greedy pass (C8) and tries to improve the committed assignment table
//! without ever relaxing a hard constraint.

use hashbrown::HashMap;

use dispatch_heuristics::population::{Greedy, Individual};
use dispatch_heuristics::utils::create_range_sampling_iter;

use crate::context::RunContext;
use crate::models::{CalendarEntry, Dispatch};
use crate::solver::greedy::{best_candidate_l0, evaluate_pair};
use crate::solver::store::AssignmentStore;

/// `Assignment.score` lives on `[0, 1]`; the reassignment threshold and
/// improvement margin below are stated on a 0-100 scale, so both compare
/// against `score * 100.0` rather than changing the field's own unit.
const REASSIGN_SCORE_THRESHOLD_PERCENT: f64 = 70.0;
const MEANINGFUL_IMPROVEMENT_PERCENT: f64 = 5.0;
const SWAP_IMPROVEMENT_EPSILON: f64 = 1e-6;
const CLEAN_SAMPLE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy)]
struct AggregateFitness(f64);

impl Individual for AggregateFitness {
    fn fitness(&self) -> f64 {
        self.0
    }
}

fn total_score(store: &AssignmentStore) -> f64 {
    store.assignments().map(|a| a.score).sum()
}

fn needs_reassignment(store: &AssignmentStore, dispatch_id: &str) -> bool {
    match store.assignment(dispatch_id) {
        Some(a) => !a.is_clean() || a.score * 100.0 < REASSIGN_SCORE_THRESHOLD_PERCENT,
        None => false,
    }
}

/// Picks the dispatches to attempt reassigning: every warned or low-score
/// one, plus a random sample of otherwise-clean ones so a pass doesn't
/// ignore improvements available to already-healthy placements.
fn select_reassignment_targets<'a>(dispatches: &'a [Dispatch], store: &AssignmentStore, ctx: &RunContext) -> Vec<&'a Dispatch> {
    let (flagged, clean): (Vec<&Dispatch>, Vec<&Dispatch>) =
        dispatches.iter().filter(|d| store.assignment(&d.dispatch_id).is_some()).partition(|d| needs_reassignment(store, &d.dispatch_id));

    let sample_indices: Vec<usize> = create_range_sampling_iter(0..clean.len(), CLEAN_SAMPLE_SIZE, ctx.random.as_ref()).collect();

    let mut targets = flagged;
    targets.extend(sample_indices.into_iter().map(|i| clean[i]));
    targets
}

fn try_reassign(dispatch: &Dispatch, calendar: &[CalendarEntry], store: &mut AssignmentStore, ctx: &RunContext) -> bool {
    let Some(old) = store.unassign(&dispatch.dispatch_id) else { return false };

    match best_candidate_l0(dispatch, calendar, store, ctx) {
        Some(new_assignment) if new_assignment.score * 100.0 >= old.score * 100.0 + MEANINGFUL_IMPROVEMENT_PERCENT => {
            ctx.logger.log(&format!(
                "postopt reassigned {} from {} to {} ({:.1} -> {:.1})",
                dispatch.dispatch_id,
                old.technician_id,
                new_assignment.technician_id,
                old.score * 100.0,
                new_assignment.score * 100.0
            ));
            store.assign(new_assignment);
            true
        }
        _ => {
            store.assign(old);
            false
        }
    }
}

fn run_reassignment_pass(dispatches: &[Dispatch], calendar: &[CalendarEntry], store: &mut AssignmentStore, ctx: &RunContext) -> u32 {
    let targets = select_reassignment_targets(dispatches, store, ctx);
    let mut improvements = 0;
    for dispatch in targets {
        if ctx.is_aborted() {
            break;
        }
        if try_reassign(dispatch, calendar, store, ctx) {
            improvements += 1;
        }
    }
    improvements
}

/// Samples candidate `(dispatch_a, dispatch_b)` pairs currently on different
/// technicians and swaps their technicians when doing so improves the
/// combined score and both sides still clear every hard constraint.
fn run_swap_pass(dispatches: &[Dispatch], calendar: &[CalendarEntry], store: &mut AssignmentStore, ctx: &RunContext) -> u32 {
    let assigned_ids: Vec<String> = store.assignments().map(|a| a.dispatch_id.clone()).collect();
    if assigned_ids.len() < 2 {
        return 0;
    }
    let dispatch_by_id: HashMap<&str, &Dispatch> = dispatches.iter().map(|d| (d.dispatch_id.as_str(), d)).collect();

    let pair_budget = (assigned_ids.len().min(CLEAN_SAMPLE_SIZE) / 2) * 2;
    let sample_indices: Vec<usize> = create_range_sampling_iter(0..assigned_ids.len(), pair_budget, ctx.random.as_ref()).collect();

    let mut improvements = 0;
    for pair in sample_indices.chunks(2) {
        if ctx.is_aborted() {
            break;
        }
        let [i, j] = match pair {
            [i, j] => [*i, *j],
            _ => continue,
        };
        let id_a = assigned_ids[i].clone();
        let id_b = assigned_ids[j].clone();
        if id_a == id_b {
            continue;
        }
        let (Some(dispatch_a), Some(dispatch_b)) = (dispatch_by_id.get(id_a.as_str()), dispatch_by_id.get(id_b.as_str())) else { continue };
        let (Some(assignment_a), Some(assignment_b)) = (store.assignment(&id_a).cloned(), store.assignment(&id_b).cloned()) else { continue };
        if assignment_a.technician_id == assignment_b.technician_id {
            continue;
        }

        let current_total = assignment_a.score + assignment_b.score;

        store.unassign(&id_a);
        store.unassign(&id_b);

        let swapped_a = evaluate_pair(dispatch_a, &assignment_b.technician_id, calendar, store, ctx);
        let swapped_b = evaluate_pair(dispatch_b, &assignment_a.technician_id, calendar, store, ctx);

        match (swapped_a, swapped_b) {
            (Some(new_a), Some(new_b)) if new_a.score + new_b.score > current_total + SWAP_IMPROVEMENT_EPSILON => {
                ctx.logger.log(&format!(
                    "postopt swapped {id_a} <-> {id_b} between technicians {} and {}",
                    assignment_a.technician_id, assignment_b.technician_id
                ));
                store.assign(new_a);
                store.assign(new_b);
                improvements += 1;
            }
            _ => {
                store.assign(assignment_a);
                store.assign(assignment_b);
            }
        }
    }
    improvements
}

/// Runs up to `ctx.config.post_opt_passes` rounds of reassignment followed
/// by pairwise swaps, stopping early once a round makes zero improvements.
/// Returns the number of passes actually run.
pub fn run_post_optimization(dispatches: &[Dispatch], calendar: &[CalendarEntry], store: &mut AssignmentStore, ctx: &RunContext) -> u32 {
    let mut tracker = Greedy::new(1, Some(AggregateFitness(total_score(store))));
    let mut passes_run = 0;

    for _ in 0..ctx.config.post_opt_passes {
        if ctx.is_aborted() {
            break;
        }
        passes_run += 1;

        let reassigned = run_reassignment_pass(dispatches, calendar, store, ctx);
        let swapped = if ctx.is_aborted() { 0 } else { run_swap_pass(dispatches, calendar, store, ctx) };

        tracker.add(AggregateFitness(total_score(store)));
        debug_assert!(store.counters_are_consistent());

        if reassigned == 0 && swapped == 0 {
            break;
        }
    }

    ctx.logger.log(&format!("postopt completed {passes_run} pass(es), aggregate score {tracker}"));
    passes_run
}
