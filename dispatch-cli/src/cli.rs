//! Argument parsing (§6 Configuration). A thin `clap` derive over the knobs
//! `dispatch-core::RunConfig` already exposes; an optional `--config` TOML
//! file supplies the same fields, with any flag on the command line winning.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "Assigns field-service dispatches to technicians", long_about = None)]
pub struct Cli {
    /// Path to the Dispatches input table (CSV or JSON, by extension).
    #[arg(long)]
    pub dispatches: PathBuf,

    /// Path to the Technicians input table.
    #[arg(long)]
    pub technicians: PathBuf,

    /// Path to the Calendar input table.
    #[arg(long)]
    pub calendar: PathBuf,

    /// Path to the History input table. Omit to train on no history, which
    /// degrades both predictors to their rule-based/defaulted fallbacks.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Where the Assignment output table is written.
    #[arg(long)]
    pub output: PathBuf,

    /// Where the per-warning output table is written, if requested.
    #[arg(long)]
    pub warnings_output: Option<PathBuf>,

    /// Where the plain-text diagnostic report is written, if requested.
    #[arg(long)]
    pub report_output: Option<PathBuf>,

    /// Optional TOML file supplying any of the flags below. A flag passed
    /// on the command line overrides the same key in this file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// `MIN_SUCCESS_THRESHOLD` override; defaults to the adaptive policy's
    /// own choice when unset.
    #[arg(long)]
    pub min_success_threshold: Option<f64>,

    /// `MAX_CAPACITY_RATIO` override; defaults to the adaptive policy's own
    /// choice when unset.
    #[arg(long)]
    pub max_capacity_ratio: Option<f64>,

    #[arg(long)]
    pub max_acceptable_distance_km: Option<f64>,

    #[arg(long)]
    pub overlap_buffer_min: Option<i64>,

    /// `ENABLE_HYBRID_SCORING`: blend the trained success model with the
    /// closed-form rule-based estimate.
    #[arg(long, default_value_t = false)]
    pub enable_hybrid_scoring: bool,

    /// Weight given to the rule-based estimate when hybrid scoring is on.
    #[arg(long)]
    pub rule_weight: Option<f64>,

    /// `USE_SKILL_CASCADE`: use the exact/same-category/related-category/any
    /// cascade instead of the default machine-learning skill gate.
    #[arg(long, default_value_t = false)]
    pub use_skill_cascade: bool,

    #[arg(long, value_enum)]
    pub scoring_strategy: Option<ScoringStrategyArg>,

    #[arg(long)]
    pub post_opt_passes: Option<u32>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// `SEASONAL_STRATEGY`: which signal family drives the adaptive
    /// threshold choice at run start. Defaults to `intelligent_auto`.
    #[arg(long, value_enum)]
    pub seasonal_strategy: Option<SeasonalStrategyArg>,

    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoringStrategyArg {
    PureSuccess,
    WeightedComposite,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeasonalStrategyArg {
    IntelligentAuto,
    Manual,
    TimeBased,
    DemandBased,
    AvailabilityBased,
}
