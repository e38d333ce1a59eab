//! C5: candidate filtering. Given a dispatch, returns technicians eligible
//! under the hard constraints (calendar, distance) and the configurable
//! ones (city/state match, capacity, skill gate), per §4.5.

use crate::geo::distance_km;
use crate::models::{CalendarEntry, Dispatch, Technician};
use crate::skill_compat::SkillCompatibilityTable;

/// Skill gate selected at run start (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillGate {
    /// Default: no skill prefilter here; C3's success score is filtered
    /// against `MIN_SUCCESS_THRESHOLD` later, in the greedy loop.
    MachineLearning,
    /// Exact -> same-category -> related-category -> any, walked top-down.
    /// Tiers are read off the learned skill-compatibility score rather than
    /// a hand-rolled skill-category dictionary.
    CascadingSkill,
}

const CASCADE_SAME_CATEGORY_MIN: f64 = 0.7;
const CASCADE_RELATED_CATEGORY_MIN: f64 = 0.4;

const CASCADE_EXACT_CONFIDENCE: f64 = 1.0;
const CASCADE_SAME_CATEGORY_CONFIDENCE: f64 = 0.85;
const CASCADE_RELATED_CATEGORY_CONFIDENCE: f64 = 0.70;
const CASCADE_ANY_CONFIDENCE: f64 = 0.50;

/// Tunables for candidate filtering; capacity ratio comes from the
/// adaptive policy (C7), the rest default to §4.5's reference values.
#[derive(Debug, Clone, Copy)]
pub struct CandidateFilterConfig {
    pub max_acceptable_distance_km: f64,
    pub city_match_required: bool,
    pub max_capacity_ratio: f64,
    pub skill_gate: SkillGate,
}

impl Default for CandidateFilterConfig {
    fn default() -> Self {
        Self {
            max_acceptable_distance_km: 200.0,
            city_match_required: true,
            max_capacity_ratio: 1.12,
            skill_gate: SkillGate::MachineLearning,
        }
    }
}

/// One technician eligible for a dispatch, with the per-candidate values
/// C6 scoring needs.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub technician: &'a Technician,
    pub distance_km: Option<f64>,
    pub workload_ratio: f64,
    pub skill_match_score: f64,
    pub skill_confidence_multiplier: f64,
}

fn city_or_state_match(dispatch: &Dispatch, tech: &Technician, require_city: bool) -> bool {
    if require_city {
        match (&dispatch.city, &tech.city) {
            (Some(d), Some(t)) => d.eq_ignore_ascii_case(t),
            _ => false,
        }
    } else {
        dispatch.state.eq_ignore_ascii_case(&tech.state)
    }
}

fn has_calendar_availability(calendar: &[CalendarEntry], technician_id: &str, dispatch: &Dispatch) -> bool {
    let date = dispatch.date();
    calendar.iter().any(|entry| entry.technician_id == technician_id && entry.date == date && entry.available && entry.has_valid_shift())
}

/// Runs the hard + configurable filters for one dispatch over the full
/// technician pool. `Err` distance (the unknown sentinel) fails the hard
/// distance filter conservatively: an unverifiable distance is never
/// treated as "close enough".
pub fn find_candidates<'a>(
    dispatch: &Dispatch,
    technicians: &'a [Technician],
    calendar: &[CalendarEntry],
    skill_table: &SkillCompatibilityTable,
    config: &CandidateFilterConfig,
) -> Vec<Candidate<'a>> {
    let mut eligible = Vec::new();

    for tech in technicians {
        if !has_calendar_availability(calendar, &tech.technician_id, dispatch) {
            continue;
        }

        let distance_km = distance_km(dispatch.customer_lat, dispatch.customer_lon, tech.tech_lat, tech.tech_lon);
        let within_distance = distance_km.map(|d| d <= config.max_acceptable_distance_km).unwrap_or(false);
        if !within_distance {
            continue;
        }

        if !city_or_state_match(dispatch, tech, config.city_match_required) {
            continue;
        }

        if tech.workload_ratio() >= config.max_capacity_ratio {
            continue;
        }

        let skill_match_score = skill_table.score(&dispatch.required_skill, &tech.primary_skill);
        eligible.push(Candidate { technician: tech, distance_km, workload_ratio: tech.workload_ratio(), skill_match_score, skill_confidence_multiplier: 1.0 });
    }

    match config.skill_gate {
        SkillGate::MachineLearning => eligible,
        SkillGate::CascadingSkill => apply_skill_cascade(eligible),
    }
}

fn apply_skill_cascade(mut candidates: Vec<Candidate<'_>>) -> Vec<Candidate<'_>> {
    let tier_of = |score: f64| -> usize {
        if score >= 0.999 {
            0
        } else if score >= CASCADE_SAME_CATEGORY_MIN {
            1
        } else if score >= CASCADE_RELATED_CATEGORY_MIN {
            2
        } else {
            3
        }
    };
    let confidence_of = |tier: usize| -> f64 {
        match tier {
            0 => CASCADE_EXACT_CONFIDENCE,
            1 => CASCADE_SAME_CATEGORY_CONFIDENCE,
            2 => CASCADE_RELATED_CATEGORY_CONFIDENCE,
            _ => CASCADE_ANY_CONFIDENCE,
        }
    };

    for tier in 0..=3 {
        let at_tier: Vec<usize> =
            candidates.iter().enumerate().filter(|(_, c)| tier_of(c.skill_match_score) == tier).map(|(i, _)| i).collect();
        if !at_tier.is_empty() {
            let confidence = confidence_of(tier);
            let keep: std::collections::HashSet<usize> = at_tier.into_iter().collect();
            let mut kept = Vec::new();
            for (i, mut candidate) in candidates.drain(..).enumerate() {
                if keep.contains(&i) {
                    candidate.skill_confidence_multiplier = confidence;
                    kept.push(candidate);
                }
            }
            return kept;
        }
    }
    Vec::new()
}
