//! `RunContext`: the process-wide immutable bundle for one run (§3).
//! Trained models, thresholds, configuration, the compatibility table,
//! and the shared randomness/logging/cancellation handles all live here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::construction::{CandidateFilterConfig, ScoringStrategy, SkillGate};
use crate::policy::{AdaptiveThresholds, Factor, SeasonalStrategy, SeasonalTable, DEFAULT_PRIORITY_ORDER};
use crate::predict::{DurationPredictor, SuccessPredictor};
use crate::prelude::{DefaultRandom, InfoLogger, Random};
use crate::skill_compat::SkillCompatibilityTable;

/// Run-level configuration, independent of trained state. Every field has
/// the default from spec §4/§6; `dispatch-cli` overrides from its flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub max_acceptable_distance_km: f64,
    pub city_match_required: bool,
    pub skill_gate: SkillGate,
    pub scoring_strategy: ScoringStrategy,
    pub post_opt_passes: u32,
    pub overlap_buffer_min_l0: i64,
    pub policy_priority_order: Vec<Factor>,
    pub seasonal_strategy: SeasonalStrategy,
    pub seed: u64,
    /// `ENABLE_HYBRID_SCORING`: blend the trained success model with
    /// [`crate::predict::rule_based_probability`] using `rule_weight`.
    pub enable_hybrid_scoring: bool,
    pub rule_weight: f64,
    /// Manual overrides for the adaptive policy's chosen thresholds
    /// (`MIN_SUCCESS_THRESHOLD`/`MAX_CAPACITY_RATIO`); `None` keeps the
    /// policy's own choice, which is the default for both.
    pub min_success_threshold_override: Option<f64>,
    pub max_capacity_ratio_override: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_acceptable_distance_km: 200.0,
            city_match_required: true,
            skill_gate: SkillGate::MachineLearning,
            scoring_strategy: ScoringStrategy::default(),
            post_opt_passes: 3,
            overlap_buffer_min_l0: 30,
            policy_priority_order: DEFAULT_PRIORITY_ORDER.to_vec(),
            seasonal_strategy: SeasonalStrategy::default(),
            seed: 0,
            enable_hybrid_scoring: false,
            rule_weight: 0.7,
            min_success_threshold_override: None,
            max_capacity_ratio_override: None,
        }
    }
}

/// Process-wide immutable bundle for one run. Cheap to clone (everything
/// mutable lives behind `Arc`), so it can be handed to every candidate
/// filter/scoring call without lifetime gymnastics.
#[derive(Clone)]
pub struct RunContext {
    pub config: RunConfig,
    pub thresholds: AdaptiveThresholds,
    pub skill_table: Arc<SkillCompatibilityTable>,
    pub success_predictor: Arc<SuccessPredictor>,
    pub duration_predictor: Arc<DurationPredictor>,
    pub seasonal_table: Arc<SeasonalTable>,
    pub random: Arc<dyn Random>,
    pub logger: Arc<dyn InfoLogger>,
    abort: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new(
        config: RunConfig,
        thresholds: AdaptiveThresholds,
        skill_table: SkillCompatibilityTable,
        success_predictor: SuccessPredictor,
        duration_predictor: DurationPredictor,
        seasonal_table: SeasonalTable,
        logger: Arc<dyn InfoLogger>,
    ) -> Self {
        Self {
            random: Arc::new(DefaultRandom::new_with_seed(config.seed)),
            config,
            thresholds,
            skill_table: Arc::new(skill_table),
            success_predictor: Arc::new(success_predictor),
            duration_predictor: Arc::new(duration_predictor),
            seasonal_table: Arc::new(seasonal_table),
            logger,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `CandidateFilterConfig` for fallback level 0 (strict defaults); the
    /// greedy loop relaxes individual fields per level from here.
    pub fn base_candidate_config(&self) -> CandidateFilterConfig {
        CandidateFilterConfig {
            max_acceptable_distance_km: self.config.max_acceptable_distance_km,
            city_match_required: self.config.city_match_required,
            max_capacity_ratio: self.thresholds.max_capacity_ratio,
            skill_gate: self.config.skill_gate,
        }
    }

    /// A handle a caller can use to request cancellation from another
    /// thread; checked between dispatches and between post-opt passes.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("thresholds", &self.thresholds)
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AdaptiveMode;

    #[derive(Debug)]
    struct NullLogger;
    impl InfoLogger for NullLogger {
        fn log(&self, _message: &str) {}
    }

    fn context() -> RunContext {
        let thresholds = AdaptiveThresholds { min_success_threshold: 0.27, max_capacity_ratio: 1.12, mode: AdaptiveMode::NormalDemand };
        RunContext::new(
            RunConfig::default(),
            thresholds,
            SkillCompatibilityTable::empty(),
            SuccessPredictor::train(&[], &SkillCompatibilityTable::empty()).0,
            DurationPredictor::train(&[], &SkillCompatibilityTable::empty(), &NullLogger),
            SeasonalTable::default(),
            Arc::new(NullLogger),
        )
    }

    #[test]
    fn abort_handle_is_shared_with_the_context() {
        let ctx = context();
        let handle = ctx.abort_handle();
        handle.store(true, Ordering::Relaxed);
        assert!(ctx.is_aborted());
    }

    #[test]
    fn base_candidate_config_uses_chosen_capacity_ratio() {
        let ctx = context();
        assert_eq!(ctx.base_candidate_config().max_capacity_ratio, 1.12);
    }
}
