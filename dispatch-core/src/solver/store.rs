//! Transactional technician/assignment bookkeeping shared by C8 and C9.
//! The only mutable per-entity counter in the data model
//! (`Technician::current_assignments`) is owned here exclusively.

use hashbrown::HashMap;

use crate::models::{Assignment, Technician};

/// Owns the live technician pool and the current assignment table for one
/// run. `assign`/`unassign` keep `current_assignments` and the assignment
/// map in lockstep, so `sum(current_assignments) == assignment_count()`
/// always holds (§4.9's invariant).
#[derive(Debug, Clone)]
pub struct AssignmentStore {
    technicians: Vec<Technician>,
    assignments: HashMap<String, Assignment>,
}

impl AssignmentStore {
    pub fn new(technicians: Vec<Technician>) -> Self {
        Self { technicians, assignments: HashMap::new() }
    }

    pub fn technicians(&self) -> &[Technician] {
        &self.technicians
    }

    pub fn technician(&self, technician_id: &str) -> Option<&Technician> {
        self.technicians.iter().find(|t| t.technician_id == technician_id)
    }

    pub fn assignment(&self, dispatch_id: &str) -> Option<&Assignment> {
        self.assignments.get(dispatch_id)
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    pub fn assignments_for_technician<'a>(&'a self, technician_id: &'a str) -> impl Iterator<Item = &'a Assignment> {
        self.assignments.values().filter(move |a| a.technician_id == technician_id)
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Commits `assignment`, incrementing its technician's counter.
    pub fn assign(&mut self, assignment: Assignment) {
        if let Some(tech) = self.technicians.iter_mut().find(|t| t.technician_id == assignment.technician_id) {
            tech.current_assignments += 1;
        }
        self.assignments.insert(assignment.dispatch_id.clone(), assignment);
    }

    /// Removes and returns the assignment for `dispatch_id`, decrementing
    /// its technician's counter first, per the decrement-before/increment-
    /// after discipline §4.9 requires during post-optimization.
    pub fn unassign(&mut self, dispatch_id: &str) -> Option<Assignment> {
        let removed = self.assignments.remove(dispatch_id)?;
        if let Some(tech) = self.technicians.iter_mut().find(|t| t.technician_id == removed.technician_id) {
            tech.current_assignments = tech.current_assignments.saturating_sub(1);
        }
        Some(removed)
    }

    /// Debug/test invariant: every committed assignment accounts for
    /// exactly one unit of some technician's counter.
    pub fn counters_are_consistent(&self) -> bool {
        self.technicians.iter().map(|t| t.current_assignments).sum::<u32>() as usize == self.assignments.len()
    }

    /// Renders every technician's counter and every committed assignment
    /// as plain text, for the "dump state" side of a fatal hard-constraint
    /// abort (§7): a snapshot a human can read without re-running anything.
    pub fn dump_state(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let _ = writeln!(out, "technicians ({}):", self.technicians.len());
        for tech in &self.technicians {
            let _ = writeln!(out, "  {} current_assignments={}", tech.technician_id, tech.current_assignments);
        }
        let _ = writeln!(out, "assignments ({}):", self.assignments.len());
        for assignment in self.assignments.values() {
            let _ = writeln!(out, "  {} -> {} score={:.4}", assignment.dispatch_id, assignment.technician_id, assignment.score);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FallbackLevel;
    use chrono::{TimeZone, Utc};

    fn tech(id: &str) -> Technician {
        Technician {
            technician_id: id.into(),
            primary_skill: "fiber".into(),
            tech_lat: Some(40.0),
            tech_lon: Some(-74.0),
            city: Some("Newark".into()),
            state: "NJ".into(),
            workload_capacity: 8,
            current_assignments: 0,
        }
    }

    fn assignment(dispatch_id: &str, technician_id: &str) -> Assignment {
        Assignment {
            dispatch_id: dispatch_id.into(),
            technician_id: technician_id.into(),
            start: Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap(),
            predicted_success: 0.8,
            predicted_duration: 55.0,
            distance_km: Some(5.0),
            skill_match_score: 1.0,
            workload_ratio_after: 0.125,
            score: 0.8,
            warnings: Vec::new(),
            fallback_level: FallbackLevel::L0,
        }
    }

    #[test]
    fn assign_increments_counter_and_unassign_decrements() {
        let mut store = AssignmentStore::new(vec![tech("t1")]);
        store.assign(assignment("d1", "t1"));
        assert_eq!(store.technician("t1").unwrap().current_assignments, 1);
        assert!(store.counters_are_consistent());

        let removed = store.unassign("d1").unwrap();
        assert_eq!(removed.dispatch_id, "d1");
        assert_eq!(store.technician("t1").unwrap().current_assignments, 0);
        assert!(store.counters_are_consistent());
    }

    #[test]
    fn unassign_missing_dispatch_is_a_noop() {
        let mut store = AssignmentStore::new(vec![tech("t1")]);
        assert!(store.unassign("ghost").is_none());
    }

    #[test]
    fn dump_state_lists_technicians_and_assignments() {
        let mut store = AssignmentStore::new(vec![tech("t1")]);
        store.assign(assignment("d1", "t1"));
        let dump = store.dump_state();
        assert!(dump.contains("t1 current_assignments=1"));
        assert!(dump.contains("d1 -> t1"));
    }

    #[test]
    fn counters_stay_consistent_across_multiple_assignments() {
        let mut store = AssignmentStore::new(vec![tech("t1")]);
        store.assign(assignment("d1", "t1"));
        store.assign(assignment("d2", "t1"));
        assert_eq!(store.technician("t1").unwrap().current_assignments, 2);
        assert_eq!(store.assignment_count(), 2);
        assert!(store.counters_are_consistent());
    }
}
