//! C3: success predictor. Estimates `P(productive)` for a `(dispatch,
//! technician)` candidate from engineered features, with a per-technician
//! calibration blend and warning-only monotonicity validation.

use hashbrown::HashMap;

use super::features::{LogisticRegression, MinMaxScaler, OneHotEncoder, MISSING_NUMERIC_FILL};
use crate::models::{HistoricalDispatch, Priority};
use crate::skill_compat::SkillCompatibilityTable;

/// Below this many usable history rows, training falls back to the
/// numeric-only model instead of the full feature set (§4.3).
pub const ENHANCED_MODE_MIN_ROWS: usize = 500;

const TRAIN_EPOCHS: usize = 300;
const TRAIN_LEARNING_RATE: f64 = 0.3;

/// §7 rule-block constants: distance and workload bands, skill match
/// adjustments, and the base probability the other factors scale.
const RULE_BASE_PROBABILITY: f64 = 0.70;
const RULE_MAX_DISTANCE_KM: f64 = 250.0;
const RULE_IDEAL_DISTANCE_KM: f64 = 50.0;
const RULE_MAX_WORKLOAD_RATIO: f64 = 1.2;
const RULE_IDEAL_WORKLOAD_RATIO: f64 = 0.8;
const RULE_SKILL_MATCH_BONUS: f64 = 0.15;
const RULE_SKILL_MISMATCH_PENALTY: f64 = 0.25;

fn rule_distance_factor(distance_km: Option<f64>) -> f64 {
    match distance_km {
        None => 1.0,
        Some(km) if km <= RULE_IDEAL_DISTANCE_KM => 1.0,
        Some(km) if km >= RULE_MAX_DISTANCE_KM => 0.5,
        Some(km) => {
            let span = RULE_MAX_DISTANCE_KM - RULE_IDEAL_DISTANCE_KM;
            1.0 - 0.5 * (km - RULE_IDEAL_DISTANCE_KM) / span
        }
    }
}

fn rule_skill_factor(skill_match_score: f64) -> f64 {
    if skill_match_score >= 0.99 {
        1.0 + RULE_SKILL_MATCH_BONUS
    } else if skill_match_score <= 0.01 {
        1.0 - RULE_SKILL_MISMATCH_PENALTY
    } else {
        1.0 - RULE_SKILL_MISMATCH_PENALTY * (1.0 - skill_match_score)
    }
}

fn rule_workload_factor(workload_ratio: f64) -> f64 {
    if workload_ratio <= RULE_IDEAL_WORKLOAD_RATIO {
        1.0
    } else if workload_ratio >= RULE_MAX_WORKLOAD_RATIO {
        0.7
    } else {
        let span = RULE_MAX_WORKLOAD_RATIO - RULE_IDEAL_WORKLOAD_RATIO;
        1.0 - 0.3 * (workload_ratio - RULE_IDEAL_WORKLOAD_RATIO) / span
    }
}

fn rule_priority_factor(priority: Priority) -> f64 {
    match priority {
        Priority::Critical => 1.10,
        Priority::High => 1.05,
        Priority::Normal => 1.0,
        Priority::Low => 0.95,
    }
}

/// Which feature set and model a trained [`SuccessPredictor`] is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessMode {
    /// Full numeric + one-hot categorical feature set.
    Enhanced,
    /// Numeric block only, used when history is too small to support the
    /// wider categorical feature space without overfitting.
    Fallback,
    /// No trainable model at all (zero history rows): the classifier is
    /// disabled and every prediction comes from [`rule_based_probability`],
    /// the §7 "rule-based probability formula" floor of the degradation
    /// ladder.
    RuleBased,
}

/// The §7 rule-based fallback: a closed-form estimate of `P(productive)`
/// from skill match, workload headroom, and distance, with no learned
/// weights at all. Used when the classifier is disabled (`SuccessMode::
/// RuleBased`) and as one side of the `ENABLE_HYBRID_SCORING` blend.
pub fn rule_based_probability(inputs: &SuccessFeatureInputs<'_>) -> f64 {
    let distance_factor = rule_distance_factor(inputs.distance_km);
    let skill_factor = rule_skill_factor(inputs.skill_match_score.clamp(0.0, 1.0));
    let workload_factor = rule_workload_factor(inputs.workload_ratio.max(0.0));
    let priority_factor = rule_priority_factor(inputs.priority);
    (RULE_BASE_PROBABILITY * distance_factor * skill_factor * workload_factor * priority_factor).clamp(0.0, 1.0)
}

/// Feature inputs for one `(dispatch, technician)` candidate at prediction
/// time. Built fresh per candidate by the caller (C5/C6), never stored.
#[derive(Debug, Clone)]
pub struct SuccessFeatureInputs<'a> {
    pub distance_km: Option<f64>,
    pub skill_match_score: f64,
    pub workload_ratio: f64,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub first_time_fix: Option<bool>,
    pub service_tier: Option<&'a str>,
    pub equipment_installed: Option<bool>,
    pub priority: Priority,
}

/// Trained success classifier plus its preprocessing state.
#[derive(Debug, Clone)]
pub struct SuccessPredictor {
    mode: SuccessMode,
    distance_scaler: MinMaxScaler,
    hour_scaler: MinMaxScaler,
    day_scaler: MinMaxScaler,
    tier_encoder: Option<OneHotEncoder>,
    equipment_encoder: Option<OneHotEncoder>,
    model: LogisticRegression,
    technician_success_rate: HashMap<String, f64>,
}

impl SuccessPredictor {
    /// Trains from history, selecting enhanced vs. fallback mode by row
    /// count per §4.3. Returns the predictor plus any monotonicity
    /// warnings found during post-training validation (logged by the
    /// caller, never fatal).
    pub fn train(history: &[HistoricalDispatch], skill_table: &SkillCompatibilityTable) -> (Self, Vec<String>) {
        let mode = if history.is_empty() {
            SuccessMode::RuleBased
        } else if history.len() >= ENHANCED_MODE_MIN_ROWS {
            SuccessMode::Enhanced
        } else {
            SuccessMode::Fallback
        };

        let hours: Vec<f64> = history.iter().map(|h| h.hour_of_day() as f64).collect();
        let days: Vec<f64> = history.iter().map(|h| h.day_of_week() as f64).collect();
        // History carries no technician location, so the scaler can't be fit from
        // data; anchor it to the default candidate-filter distance ceiling (§4.5)
        // instead of an empty range, so real inference-time distances still vary.
        let distance_scaler = MinMaxScaler::fit(&[0.0, 200.0]);
        let hour_scaler = MinMaxScaler::fit(&hours);
        let day_scaler = MinMaxScaler::fit(&days);

        let (tier_encoder, equipment_encoder) = if mode == SuccessMode::Enhanced {
            let tiers: Vec<&str> = history.iter().filter_map(|h| h.service_tier.as_deref()).collect();
            let equip: Vec<&str> = history
                .iter()
                .filter_map(|h| h.equipment_installed.map(|b| if b { "true" } else { "false" }))
                .collect();
            (Some(OneHotEncoder::fit(tiers.into_iter())), Some(OneHotEncoder::fit(equip.into_iter())))
        } else {
            (None, None)
        };

        let mut technician_success_rate: HashMap<String, (u32, u32)> = HashMap::new();
        for row in history {
            let entry = technician_success_rate.entry(row.technician_id.clone()).or_insert((0, 0));
            entry.0 += 1;
            if row.productive {
                entry.1 += 1;
            }
        }
        let technician_success_rate: HashMap<String, f64> = technician_success_rate
            .into_iter()
            .map(|(id, (n, hit))| (id, hit as f64 / n.max(1) as f64))
            .collect();

        let mut predictor = Self {
            mode,
            distance_scaler,
            hour_scaler,
            day_scaler,
            tier_encoder,
            equipment_encoder,
            model: LogisticRegression::train(&[], &[], 0, TRAIN_LEARNING_RATE),
            technician_success_rate,
        };

        let feature_rows: Vec<Vec<f64>> =
            history.iter().map(|row| predictor.encode(&predictor.feature_inputs_for(row, skill_table))).collect();
        let labels: Vec<f64> = history.iter().map(|row| if row.productive { 1.0 } else { 0.0 }).collect();
        predictor.model = LogisticRegression::train(&feature_rows, &labels, TRAIN_EPOCHS, TRAIN_LEARNING_RATE);

        let warnings = predictor.validate_monotonicity();
        (predictor, warnings)
    }

    fn feature_inputs_for<'a>(
        &self,
        row: &'a HistoricalDispatch,
        skill_table: &SkillCompatibilityTable,
    ) -> SuccessFeatureInputs<'a> {
        SuccessFeatureInputs {
            // Historical rows carry no technician coordinates or point-in-time
            // workload, so both are always "unknown" during training.
            distance_km: None,
            skill_match_score: skill_table.score(&row.required_skill, &row.technician_skill),
            workload_ratio: MISSING_NUMERIC_FILL,
            hour_of_day: row.hour_of_day(),
            day_of_week: row.day_of_week(),
            is_weekend: row.is_weekend(),
            first_time_fix: row.first_time_fix,
            service_tier: row.service_tier.as_deref(),
            equipment_installed: row.equipment_installed,
            priority: row.priority,
        }
    }

    fn encode(&self, inputs: &SuccessFeatureInputs<'_>) -> Vec<f64> {
        let mut out = Vec::new();
        out.push(self.distance_scaler.transform_option(inputs.distance_km));
        out.push(inputs.skill_match_score.clamp(0.0, 1.0));
        out.push(inputs.workload_ratio.clamp(0.0, 1.5) / 1.5);
        out.push(self.hour_scaler.transform(inputs.hour_of_day as f64));
        out.push(self.day_scaler.transform(inputs.day_of_week as f64));
        out.push(if inputs.is_weekend { 1.0 } else { 0.0 });
        out.push(inputs.first_time_fix.map(|b| if b { 1.0 } else { 0.0 }).unwrap_or(MISSING_NUMERIC_FILL));

        if let Some(encoder) = &self.tier_encoder {
            encoder.encode_into(inputs.service_tier, &mut out);
        }
        if let Some(encoder) = &self.equipment_encoder {
            let label = inputs.equipment_installed.map(|b| if b { "true" } else { "false" });
            encoder.encode_into(label, &mut out);
        }
        out
    }

    /// Predicts `P(productive)`, optionally blended with `technician_id`'s
    /// historical rate per the §4.3 calibration formula. In
    /// [`SuccessMode::RuleBased`] there is no trained model to calibrate,
    /// so this returns [`rule_based_probability`] directly.
    pub fn predict(&self, inputs: &SuccessFeatureInputs<'_>, technician_id: &str) -> f64 {
        if self.mode == SuccessMode::RuleBased {
            return rule_based_probability(inputs);
        }
        let raw = self.model.predict_proba(&self.encode(inputs));
        match self.technician_success_rate.get(technician_id) {
            Some(&s_t) => (raw * (0.7 + 0.3 * s_t / 0.75)).clamp(0.0, 1.0),
            None => raw.clamp(0.0, 1.0),
        }
    }

    /// `predict`, optionally blended with [`rule_based_probability`] per
    /// `ENABLE_HYBRID_SCORING`/`rule_weight` (§6): `model * (1 -
    /// rule_weight) + rule_based * rule_weight`. A no-op in
    /// [`SuccessMode::RuleBased`], where `predict` already is the rule.
    pub fn predict_hybrid(&self, inputs: &SuccessFeatureInputs<'_>, technician_id: &str, enable_hybrid: bool, rule_weight: f64) -> f64 {
        let model_probability = self.predict(inputs, technician_id);
        if !enable_hybrid || self.mode == SuccessMode::RuleBased {
            return model_probability;
        }
        let rule_weight = rule_weight.clamp(0.0, 1.0);
        (model_probability * (1.0 - rule_weight) + rule_based_probability(inputs) * rule_weight).clamp(0.0, 1.0)
    }

    pub fn mode(&self) -> SuccessMode {
        self.mode
    }

    /// Checks that predicted probability increases as distance decreases,
    /// workload decreases, and skill match increases, holding the rest at
    /// a canonical midpoint. Never fails the run; only returns warnings.
    fn validate_monotonicity(&self) -> Vec<String> {
        let midpoint = |distance, skill, workload| SuccessFeatureInputs {
            distance_km: Some(distance),
            skill_match_score: skill,
            workload_ratio: workload,
            hour_of_day: 12,
            day_of_week: 2,
            is_weekend: false,
            first_time_fix: Some(true),
            service_tier: None,
            equipment_installed: None,
            priority: Priority::Normal,
        };

        let mut warnings = Vec::new();

        let near = self.predict(&midpoint(5.0, 0.8, 0.3), "");
        let far = self.predict(&midpoint(150.0, 0.8, 0.3), "");
        if near < far {
            warnings.push("success predictor: probability did not decrease with distance at the canonical midpoint".to_string());
        }

        let light = self.predict(&midpoint(20.0, 0.8, 0.1), "");
        let heavy = self.predict(&midpoint(20.0, 0.8, 1.0), "");
        if light < heavy {
            warnings.push("success predictor: probability did not decrease with workload at the canonical midpoint".to_string());
        }

        let low_skill = self.predict(&midpoint(20.0, 0.2, 0.3), "");
        let high_skill = self.predict(&midpoint(20.0, 0.95, 0.3), "");
        if high_skill < low_skill {
            warnings.push("success predictor: probability did not increase with skill match at the canonical midpoint".to_string());
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{TimeZone, Utc};

    fn row(hour: u32, productive: bool, tech: &str) -> HistoricalDispatch {
        HistoricalDispatch {
            dispatch_id: "h".into(),
            priority: Priority::Normal,
            required_skill: "fiber".into(),
            service_tier: Some("gold".into()),
            equipment_installed: Some(true),
            first_time_fix: Some(true),
            appointment_start: Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap(),
            appointment_end: Utc.with_ymd_and_hms(2026, 3, 2, hour + 1, 0, 0).unwrap(),
            customer_lat: None,
            customer_lon: None,
            city: None,
            state: "NJ".into(),
            expected_duration_min: 60.0,
            technician_skill: "fiber".into(),
            technician_id: tech.into(),
            productive,
            actual_duration_min: 55.0,
        }
    }

    #[test]
    fn small_history_uses_fallback_mode() {
        let history = vec![row(9, true, "t1"), row(10, false, "t2")];
        let table = SkillCompatibilityTable::empty();
        let (predictor, _) = SuccessPredictor::train(&history, &table);
        assert_eq!(predictor.mode(), SuccessMode::Fallback);
    }

    #[test]
    fn large_history_uses_enhanced_mode() {
        let history: Vec<_> = (0..ENHANCED_MODE_MIN_ROWS).map(|i| row((i % 24) as u32, i % 2 == 0, "t1")).collect();
        let table = SkillCompatibilityTable::empty();
        let (predictor, _) = SuccessPredictor::train(&history, &table);
        assert_eq!(predictor.mode(), SuccessMode::Enhanced);
    }

    #[test]
    fn prediction_stays_in_unit_range() {
        let history = vec![row(9, true, "t1"), row(10, false, "t2"), row(11, true, "t1")];
        let table = SkillCompatibilityTable::empty();
        let (predictor, _) = SuccessPredictor::train(&history, &table);
        let inputs = SuccessFeatureInputs {
            distance_km: Some(10.0),
            skill_match_score: 0.9,
            workload_ratio: 0.2,
            hour_of_day: 9,
            day_of_week: 1,
            is_weekend: false,
            first_time_fix: Some(true),
            service_tier: Some("gold"),
            equipment_installed: Some(true),
            priority: Priority::Normal,
        };
        let p = predictor.predict(&inputs, "t1");
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn empty_history_degrades_to_rule_based_mode() {
        let table = SkillCompatibilityTable::empty();
        let (predictor, _) = SuccessPredictor::train(&[], &table);
        assert_eq!(predictor.mode(), SuccessMode::RuleBased);

        let inputs = SuccessFeatureInputs {
            distance_km: Some(5.0),
            skill_match_score: 1.0,
            workload_ratio: 0.1,
            hour_of_day: 9,
            day_of_week: 1,
            is_weekend: false,
            first_time_fix: Some(true),
            service_tier: None,
            equipment_installed: None,
            priority: Priority::Normal,
        };
        assert_eq!(predictor.predict(&inputs, "t1"), rule_based_probability(&inputs));
    }

    #[test]
    fn hybrid_blend_moves_toward_the_rule_based_estimate() {
        let history = vec![row(9, false, "t1"), row(10, false, "t1"), row(11, false, "t1")];
        let table = SkillCompatibilityTable::empty();
        let (predictor, _) = SuccessPredictor::train(&history, &table);
        let inputs = SuccessFeatureInputs {
            distance_km: Some(5.0),
            skill_match_score: 1.0,
            workload_ratio: 0.1,
            hour_of_day: 9,
            day_of_week: 1,
            is_weekend: false,
            first_time_fix: Some(true),
            service_tier: None,
            equipment_installed: None,
            priority: Priority::Normal,
        };
        let unblended = predictor.predict(&inputs, "ghost");
        let blended = predictor.predict_hybrid(&inputs, "ghost", true, 1.0);
        assert_eq!(blended, rule_based_probability(&inputs));
        assert_ne!(blended, unblended);
    }

    #[test]
    fn calibration_only_applies_to_known_technicians() {
        let history = vec![row(9, true, "t1"), row(10, true, "t1"), row(11, true, "t1")];
        let table = SkillCompatibilityTable::empty();
        let (predictor, _) = SuccessPredictor::train(&history, &table);
        let inputs = SuccessFeatureInputs {
            distance_km: Some(10.0),
            skill_match_score: 0.5,
            workload_ratio: 0.2,
            hour_of_day: 9,
            day_of_week: 1,
            is_weekend: false,
            first_time_fix: Some(true),
            service_tier: None,
            equipment_installed: None,
            priority: Priority::Normal,
        };
        let known = predictor.predict(&inputs, "t1");
        let unknown = predictor.predict(&inputs, "ghost");
        assert!(known >= 0.0 && known <= 1.0);
        assert!(unknown >= 0.0 && unknown <= 1.0);
    }
}
