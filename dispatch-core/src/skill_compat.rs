//! C2: skill-compatibility learning. Turns historical `(required_skill,
//! technician_skill, productive)` rows into a lookup table of scores.

use hashbrown::HashMap;

use crate::models::HistoricalDispatch;

/// Conservative non-exact score assigned when fewer than 3 samples back a
/// pair, and the value returned for missing/empty skill inputs.
const CONSERVATIVE_PRIOR: f64 = 0.3;
const MIN_SAMPLES_FOR_LEARNED_SCORE: u32 = 3;

#[derive(Debug, Clone, Copy, Default)]
struct PairStats {
    sample_count: u32,
    productive_count: u32,
}

impl PairStats {
    fn success_rate(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.productive_count as f64 / self.sample_count as f64
        }
    }
}

/// Learned `(required_skill, technician_skill) -> score` mapping, with a
/// clipped fallback for pairs never observed in history.
#[derive(Debug, Clone)]
pub struct SkillCompatibilityTable {
    scores: HashMap<(String, String), f64>,
    fallback_mean: f64,
}

impl SkillCompatibilityTable {
    /// Trains the table from historical dispatches, per spec.md §4.2.
    pub fn train(history: &[HistoricalDispatch]) -> Self {
        let mut stats: HashMap<(String, String), PairStats> = HashMap::new();
        for row in history {
            let key = (row.required_skill.clone(), row.technician_skill.clone());
            let entry = stats.entry(key).or_default();
            entry.sample_count += 1;
            if row.productive {
                entry.productive_count += 1;
            }
        }

        let exact_rates: Vec<f64> = stats
            .iter()
            .filter(|((req, tech), _)| req == tech)
            .map(|(_, s)| s.success_rate())
            .collect();
        let baseline =
            if exact_rates.is_empty() { 0.5 } else { exact_rates.iter().sum::<f64>() / exact_rates.len() as f64 };

        let mut scores = HashMap::new();
        for (key, stat) in &stats {
            let (req, tech) = key;
            if req == tech {
                // Exact-match pairs are looked up via the `score` fast path and never
                // stored here, but keep them out of the fallback-mean computation too.
                continue;
            }
            let score = if stat.sample_count < MIN_SAMPLES_FOR_LEARNED_SCORE {
                CONSERVATIVE_PRIOR
            } else {
                (CONSERVATIVE_PRIOR + 0.7 * stat.success_rate() / baseline).clamp(0.1, 0.95)
            };
            scores.insert(key.clone(), score);
        }

        let fallback_mean = if scores.is_empty() {
            CONSERVATIVE_PRIOR
        } else {
            (scores.values().sum::<f64>() / scores.len() as f64).clamp(0.2, 0.6)
        };

        Self { scores, fallback_mean }
    }

    /// An empty table: every non-exact lookup falls back to the
    /// conservative prior, matching "missing inputs -> 0.3".
    pub fn empty() -> Self {
        Self { scores: HashMap::new(), fallback_mean: CONSERVATIVE_PRIOR }
    }

    /// Looks up `(required, tech)`, then the swapped order, then the
    /// clipped global fallback. Exact matches always return `1.0`.
    pub fn score(&self, required_skill: &str, tech_skill: &str) -> f64 {
        if required_skill.is_empty() || tech_skill.is_empty() {
            return CONSERVATIVE_PRIOR;
        }
        if required_skill == tech_skill {
            return 1.0;
        }
        let forward = (required_skill.to_string(), tech_skill.to_string());
        if let Some(score) = self.scores.get(&forward) {
            return *score;
        }
        let reversed = (tech_skill.to_string(), required_skill.to_string());
        if let Some(score) = self.scores.get(&reversed) {
            return *score;
        }
        self.fallback_mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::Utc;

    fn row(required: &str, tech_skill: &str, productive: bool) -> HistoricalDispatch {
        HistoricalDispatch {
            dispatch_id: "h".into(),
            priority: Priority::Normal,
            required_skill: required.into(),
            service_tier: None,
            equipment_installed: None,
            first_time_fix: None,
            appointment_start: Utc::now(),
            appointment_end: Utc::now(),
            customer_lat: None,
            customer_lon: None,
            city: None,
            state: "NJ".into(),
            expected_duration_min: 60.0,
            technician_skill: tech_skill.into(),
            technician_id: "t".into(),
            productive,
            actual_duration_min: 55.0,
        }
    }

    #[test]
    fn exact_match_is_always_one() {
        let table = SkillCompatibilityTable::empty();
        assert_eq!(table.score("fiber", "fiber"), 1.0);

        let history = vec![row("fiber", "fiber", false), row("fiber", "fiber", false)];
        let table = SkillCompatibilityTable::train(&history);
        assert_eq!(table.score("fiber", "fiber"), 1.0);
    }

    #[test]
    fn sparse_non_exact_pair_gets_conservative_prior() {
        let history = vec![row("fiber", "copper", true), row("fiber", "copper", true)];
        let table = SkillCompatibilityTable::train(&history);
        assert_eq!(table.score("fiber", "copper"), 0.3);
    }

    #[test]
    fn swapped_order_is_still_found() {
        let history: Vec<_> = (0..5).map(|_| row("fiber", "copper", true)).collect();
        let table = SkillCompatibilityTable::train(&history);
        assert_eq!(table.score("copper", "fiber"), table.score("fiber", "copper"));
    }

    #[test]
    fn unknown_pair_uses_clipped_fallback() {
        let history: Vec<_> = (0..10).map(|_| row("fiber", "copper", true)).collect();
        let table = SkillCompatibilityTable::train(&history);
        let fallback = table.score("hvac", "plumbing");
        assert!((0.2..=0.6).contains(&fallback));
    }

    #[test]
    fn missing_skill_returns_conservative_prior() {
        let table = SkillCompatibilityTable::empty();
        assert_eq!(table.score("", "fiber"), 0.3);
        assert_eq!(table.score("fiber", ""), 0.3);
    }

    #[test]
    fn score_is_monotone_in_success_rate() {
        // Pair A: 9/10 productive. Pair B: 1/10 productive. Both n>=3.
        let mut history: Vec<_> = (0..9).map(|_| row("fiber", "coax", true)).collect();
        history.push(row("fiber", "coax", false));
        history.extend((0..1).map(|_| row("fiber", "dsl", true)));
        history.extend((0..9).map(|_| row("fiber", "dsl", false)));

        let table = SkillCompatibilityTable::train(&history);
        assert!(table.score("fiber", "coax") >= table.score("fiber", "dsl") - 1e-9);
    }

    #[test]
    fn all_scores_are_within_unit_range() {
        let history: Vec<_> = (0..20).map(|i| row("fiber", "coax", i % 3 != 0)).collect();
        let table = SkillCompatibilityTable::train(&history);
        for score in table.scores.values() {
            assert!((0.0..=1.0).contains(score));
        }
    }
}
