//! Merges a parsed [`Cli`] with an optional TOML config file into a
//! `dispatch-core::RunConfig`. Flags on the command line win over the same
//! key in the file; both fall back to `RunConfig::default()`.

use std::path::Path;

use dispatch_core::construction::{ScoringStrategy, SkillGate};
use dispatch_core::policy::{SeasonalStrategy, DEFAULT_PRIORITY_ORDER};
use dispatch_core::{EngineError, RunConfig};
use serde::Deserialize;

use crate::cli::{Cli, ScoringStrategyArg, SeasonalStrategyArg};

/// Mirror of [`Cli`]'s overridable fields, read from `--config`. Every field
/// is optional: an absent key simply leaves the flag/default value as-is.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub min_success_threshold: Option<f64>,
    pub max_capacity_ratio: Option<f64>,
    pub max_acceptable_distance_km: Option<f64>,
    pub overlap_buffer_min: Option<i64>,
    pub enable_hybrid_scoring: Option<bool>,
    pub rule_weight: Option<f64>,
    pub use_skill_cascade: Option<bool>,
    pub scoring_strategy: Option<String>,
    pub post_opt_passes: Option<u32>,
    pub seed: Option<u64>,
    pub seasonal_strategy: Option<String>,
}

pub fn load_file_config(path: &Path) -> Result<FileConfig, EngineError> {
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("reading {}: {e}", path.display())))?;
    toml::from_str(&text).map_err(|e| EngineError::Config(format!("parsing {}: {e}", path.display())))
}

fn scoring_strategy_from_name(name: &str) -> Result<ScoringStrategy, EngineError> {
    match name {
        "pure-success" => Ok(ScoringStrategy::PureSuccess),
        "weighted-composite" => Ok(ScoringStrategy::WeightedComposite),
        other => Err(EngineError::Config(format!("unknown scoring_strategy `{other}`; expected pure-success or weighted-composite"))),
    }
}

fn seasonal_strategy_from_name(name: &str) -> Result<SeasonalStrategy, EngineError> {
    match name {
        "intelligent_auto" => Ok(SeasonalStrategy::IntelligentAuto),
        "manual" => Ok(SeasonalStrategy::Manual),
        "time_based" => Ok(SeasonalStrategy::TimeBased),
        "demand_based" => Ok(SeasonalStrategy::DemandBased),
        "availability_based" => Ok(SeasonalStrategy::AvailabilityBased),
        other => Err(EngineError::Config(format!(
            "unknown seasonal_strategy `{other}`; expected one of intelligent_auto, manual, time_based, demand_based, availability_based"
        ))),
    }
}

/// Builds the effective `RunConfig`. `file` is `None` when `--config` was
/// not passed.
pub fn build_run_config(cli: &Cli, file: Option<&FileConfig>) -> Result<RunConfig, EngineError> {
    let mut config = RunConfig::default();

    let min_success_threshold = cli.min_success_threshold.or_else(|| file.and_then(|f| f.min_success_threshold));
    let max_capacity_ratio = cli.max_capacity_ratio.or_else(|| file.and_then(|f| f.max_capacity_ratio));
    let max_acceptable_distance_km = cli.max_acceptable_distance_km.or_else(|| file.and_then(|f| f.max_acceptable_distance_km));
    let overlap_buffer_min = cli.overlap_buffer_min.or_else(|| file.and_then(|f| f.overlap_buffer_min));
    let enable_hybrid_scoring = cli.enable_hybrid_scoring || file.and_then(|f| f.enable_hybrid_scoring).unwrap_or(false);
    let rule_weight = cli.rule_weight.or_else(|| file.and_then(|f| f.rule_weight));
    let use_skill_cascade = cli.use_skill_cascade || file.and_then(|f| f.use_skill_cascade).unwrap_or(false);
    let scoring_strategy_name = cli.scoring_strategy.map(|s| match s {
        ScoringStrategyArg::PureSuccess => "pure-success".to_string(),
        ScoringStrategyArg::WeightedComposite => "weighted-composite".to_string(),
    }).or_else(|| file.and_then(|f| f.scoring_strategy.clone()));
    let post_opt_passes = cli.post_opt_passes.or_else(|| file.and_then(|f| f.post_opt_passes));
    let seed = cli.seed.or_else(|| file.and_then(|f| f.seed));
    let seasonal_strategy_name = cli.seasonal_strategy.map(|s| match s {
        SeasonalStrategyArg::IntelligentAuto => "intelligent_auto".to_string(),
        SeasonalStrategyArg::Manual => "manual".to_string(),
        SeasonalStrategyArg::TimeBased => "time_based".to_string(),
        SeasonalStrategyArg::DemandBased => "demand_based".to_string(),
        SeasonalStrategyArg::AvailabilityBased => "availability_based".to_string(),
    }).or_else(|| file.and_then(|f| f.seasonal_strategy.clone()));

    if let Some(v) = max_acceptable_distance_km {
        config.max_acceptable_distance_km = v;
    }
    if let Some(v) = overlap_buffer_min {
        config.overlap_buffer_min_l0 = v;
    }
    config.enable_hybrid_scoring = enable_hybrid_scoring;
    if let Some(v) = rule_weight {
        config.rule_weight = v;
    }
    config.skill_gate = if use_skill_cascade { SkillGate::CascadingSkill } else { SkillGate::MachineLearning };
    if let Some(name) = scoring_strategy_name {
        config.scoring_strategy = scoring_strategy_from_name(&name)?;
    }
    if let Some(v) = post_opt_passes {
        config.post_opt_passes = v;
    }
    if let Some(v) = seed {
        config.seed = v;
    }
    if let Some(name) = seasonal_strategy_name {
        config.seasonal_strategy = seasonal_strategy_from_name(&name)?;
    }
    config.min_success_threshold_override = min_success_threshold;
    config.max_capacity_ratio_override = max_capacity_ratio;
    config.policy_priority_order = DEFAULT_PRIORITY_ORDER.to_vec();

    Ok(config)
}
