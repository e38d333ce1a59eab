//! C4: duration predictor. Regresses job minutes from the same feature
//! shape as C3 plus derived interactions and technician/city aggregates,
//! with outlier dropping, a held-out split, and a hyperparameter sweep
//! over learning-rate/epoch pairs for the additive model in
//! [`super::features`].

use hashbrown::HashMap;

use super::features::{mean_std, percentile, LogisticRegression, MinMaxScaler, OneHotEncoder, MISSING_NUMERIC_FILL};
use crate::models::HistoricalDispatch;
use crate::prelude::InfoLogger;
use crate::skill_compat::SkillCompatibilityTable;

const OUTLIER_Z_SCORE: f64 = 3.0;
const TEST_SPLIT_FRACTION: f64 = 0.2;
const SPLIT_SEED: u64 = 20260305;

/// Candidate (epochs, learning_rate) pairs swept during training, standing
/// in for the named GBDT grid (`n_estimators`, `max_depth`, `learning_rate`,
/// `subsample`) over the additive model actually used.
const HYPERPARAMETER_GRID: &[(usize, f64)] = &[(150, 0.05), (150, 0.1), (300, 0.05), (300, 0.1)];

/// Feature inputs for one candidate at prediction time.
#[derive(Debug, Clone)]
pub struct DurationFeatureInputs<'a> {
    pub distance_km: Option<f64>,
    pub skill_match_score: f64,
    pub workload_ratio: f64,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub first_time_fix: Option<bool>,
    pub service_tier: Option<&'a str>,
    pub equipment_installed: Option<bool>,
    pub technician_id: &'a str,
    pub city: Option<&'a str>,
}

/// Diagnostics retained from training, per §4.4.
#[derive(Debug, Clone, Copy)]
pub struct DurationMetrics {
    pub train_mae: f64,
    pub train_rmse: f64,
    pub train_r2: f64,
    pub test_mae: f64,
    pub test_rmse: f64,
    pub test_r2: f64,
    pub cv_mae_mean: f64,
    pub cv_mae_std: f64,
}

#[derive(Debug, Clone)]
pub struct DurationPredictor {
    distance_scaler: MinMaxScaler,
    hour_scaler: MinMaxScaler,
    day_scaler: MinMaxScaler,
    tier_encoder: OneHotEncoder,
    equipment_encoder: OneHotEncoder,
    model: LogisticRegression,
    technician_expanding_mean: HashMap<String, f64>,
    city_frequency: HashMap<String, f64>,
    clip_low: f64,
    clip_high: f64,
    pub metrics: DurationMetrics,
}

impl DurationPredictor {
    pub fn train(
        history: &[HistoricalDispatch],
        skill_table: &SkillCompatibilityTable,
        logger: &dyn InfoLogger,
    ) -> Self {
        let mut sorted: Vec<&HistoricalDispatch> = history.iter().collect();
        let mut previous_ts = None;
        let mut out_of_order = false;
        for row in history {
            if let Some(prev) = previous_ts {
                if row.appointment_start < prev {
                    out_of_order = true;
                }
            }
            previous_ts = Some(row.appointment_start);
        }
        if out_of_order {
            logger.log("duration predictor: history timestamps are not sorted ascending per technician; expanding-mean features may leak across unordered rows");
        }
        sorted.sort_by_key(|row| row.appointment_start);

        let targets: Vec<f64> = sorted.iter().map(|r| r.actual_duration_min).collect();
        let (mean, std) = mean_std(&targets);
        let kept: Vec<&HistoricalDispatch> = sorted
            .into_iter()
            .zip(targets.iter())
            .filter(|(_, &t)| std < 1e-9 || ((t - mean) / std).abs() <= OUTLIER_Z_SCORE)
            .map(|(row, _)| row)
            .collect();

        let clip_low = percentile(&kept.iter().map(|r| r.actual_duration_min).collect::<Vec<_>>(), 1.0);
        let clip_high = percentile(&kept.iter().map(|r| r.actual_duration_min).collect::<Vec<_>>(), 99.0);

        let hours: Vec<f64> = kept.iter().map(|h| h.hour_of_day() as f64).collect();
        let days: Vec<f64> = kept.iter().map(|h| h.day_of_week() as f64).collect();
        let distance_scaler = MinMaxScaler::fit(&[0.0, 200.0]);
        let hour_scaler = MinMaxScaler::fit(&hours);
        let day_scaler = MinMaxScaler::fit(&days);
        let tiers: Vec<&str> = kept.iter().filter_map(|h| h.service_tier.as_deref()).collect();
        let equip: Vec<&str> =
            kept.iter().filter_map(|h| h.equipment_installed.map(|b| if b { "true" } else { "false" })).collect();
        let tier_encoder = OneHotEncoder::fit(tiers.into_iter());
        let equipment_encoder = OneHotEncoder::fit(equip.into_iter());

        let technician_expanding_mean = expanding_means(&kept, |r| r.technician_id.clone());
        let city_frequency = city_frequencies(&kept);

        let mut predictor = Self {
            distance_scaler,
            hour_scaler,
            day_scaler,
            tier_encoder,
            equipment_encoder,
            model: LogisticRegression::train_linear(&[], &[], 0, 0.0),
            technician_expanding_mean,
            city_frequency,
            clip_low,
            clip_high,
            metrics: DurationMetrics {
                train_mae: 0.0,
                train_rmse: 0.0,
                train_r2: 0.0,
                test_mae: 0.0,
                test_rmse: 0.0,
                test_r2: 0.0,
                cv_mae_mean: 0.0,
                cv_mae_std: 0.0,
            },
        };

        let rows: Vec<Vec<f64>> =
            kept.iter().map(|row| predictor.encode(&predictor.feature_inputs_for(row, skill_table))).collect();
        let targets: Vec<f64> = kept.iter().map(|r| r.actual_duration_min).collect();

        let (train_rows, train_targets, test_rows, test_targets) = split(&rows, &targets, TEST_SPLIT_FRACTION, SPLIT_SEED);

        let mut best: Option<(f64, LogisticRegression)> = None;
        let mut cv_scores = Vec::new();
        for &(epochs, lr) in HYPERPARAMETER_GRID {
            let folds = cross_validate(&train_rows, &train_targets, epochs, lr, 3);
            let fold_mean = folds.iter().sum::<f64>() / folds.len().max(1) as f64;
            cv_scores.push(fold_mean);
            if best.as_ref().map(|(mae, _)| fold_mean < *mae).unwrap_or(true) {
                let candidate = LogisticRegression::train_linear(&train_rows, &train_targets, epochs, lr);
                best = Some((fold_mean, candidate));
            }
        }
        let (best_cv_mae, model) = best.unwrap_or_else(|| (0.0, LogisticRegression::train_linear(&[], &[], 0, 0.0)));
        let (cv_mean, cv_std) = mean_std(&cv_scores);
        predictor.model = model;

        let (train_mae, train_rmse, train_r2) = evaluate(&predictor.model, &train_rows, &train_targets);
        let (test_mae, test_rmse, test_r2) = evaluate(&predictor.model, &test_rows, &test_targets);
        predictor.metrics = DurationMetrics {
            train_mae,
            train_rmse,
            train_r2,
            test_mae,
            test_rmse,
            test_r2,
            cv_mae_mean: if cv_scores.is_empty() { best_cv_mae } else { cv_mean },
            cv_mae_std: cv_std,
        };

        predictor
    }

    fn feature_inputs_for<'a>(
        &self,
        row: &'a HistoricalDispatch,
        skill_table: &SkillCompatibilityTable,
    ) -> DurationFeatureInputs<'a> {
        DurationFeatureInputs {
            distance_km: None,
            skill_match_score: skill_table.score(&row.required_skill, &row.technician_skill),
            workload_ratio: MISSING_NUMERIC_FILL,
            hour_of_day: row.hour_of_day(),
            day_of_week: row.day_of_week(),
            is_weekend: row.is_weekend(),
            first_time_fix: row.first_time_fix,
            service_tier: row.service_tier.as_deref(),
            equipment_installed: row.equipment_installed,
            technician_id: &row.technician_id,
            city: row.city.as_deref(),
        }
    }

    fn encode(&self, inputs: &DurationFeatureInputs<'_>) -> Vec<f64> {
        let distance = self.distance_scaler.transform_option(inputs.distance_km);
        let equipment_present = inputs.equipment_installed.unwrap_or(false) as u8 as f64;
        let first_time_fix = inputs.first_time_fix.map(|b| if b { 1.0 } else { 0.0 }).unwrap_or(MISSING_NUMERIC_FILL);

        let mut out = Vec::new();
        out.push(distance);
        out.push(inputs.skill_match_score.clamp(0.0, 1.0));
        out.push(inputs.workload_ratio.clamp(0.0, 1.5) / 1.5);
        out.push(self.hour_scaler.transform(inputs.hour_of_day as f64));
        out.push(self.day_scaler.transform(inputs.day_of_week as f64));
        out.push(if inputs.is_weekend { 1.0 } else { 0.0 });
        out.push(first_time_fix);
        out.push(distance * equipment_present);
        out.push(distance * first_time_fix);
        out.push(self.technician_expanding_mean.get(inputs.technician_id).copied().unwrap_or(MISSING_NUMERIC_FILL));
        out.push(
            inputs
                .city
                .and_then(|c| self.city_frequency.get(c))
                .copied()
                .unwrap_or(MISSING_NUMERIC_FILL),
        );

        self.tier_encoder.encode_into(inputs.service_tier, &mut out);
        let equip_label = inputs.equipment_installed.map(|b| if b { "true" } else { "false" });
        self.equipment_encoder.encode_into(equip_label, &mut out);
        out
    }

    /// Predicts minutes, clipped to the training targets' `[p01, p99]`.
    pub fn predict(&self, inputs: &DurationFeatureInputs<'_>) -> f64 {
        self.model.predict_linear(&self.encode(inputs)).clamp(self.clip_low, self.clip_high)
    }
}

/// Chronological expanding mean of `target` grouped by `key`, computed in
/// timestamp order so a row only ever sees strictly prior outcomes.
fn expanding_means(history: &[&HistoricalDispatch], key: impl Fn(&HistoricalDispatch) -> String) -> HashMap<String, f64> {
    let mut running: HashMap<String, (f64, u32)> = HashMap::new();
    let mut result = HashMap::new();
    for row in history {
        let k = key(row);
        let entry = running.entry(k.clone()).or_insert((0.0, 0));
        // Expose the mean *before* folding this row in, so training features
        // never see the current row's own outcome.
        if entry.1 > 0 {
            result.insert(k.clone(), entry.0 / entry.1 as f64);
        }
        entry.0 += row.actual_duration_min;
        entry.1 += 1;
    }
    for (k, (sum, n)) in running {
        result.entry(k).or_insert(sum / n.max(1) as f64);
    }
    result
}

fn city_frequencies(history: &[&HistoricalDispatch]) -> HashMap<String, f64> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for row in history {
        if let Some(city) = &row.city {
            *counts.entry(city.clone()).or_insert(0) += 1;
        }
    }
    let total = history.len().max(1) as f64;
    counts.into_iter().map(|(city, n)| (city, n as f64 / total)).collect()
}

/// Deterministic 80/20 split keyed on a fixed seed, not a global RNG, so
/// duration training is reproducible independent of run seed.
fn split(
    rows: &[Vec<f64>],
    targets: &[f64],
    test_fraction: f64,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<f64>, Vec<Vec<f64>>, Vec<f64>) {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    let mut state = seed;
    for i in (1..order.len()).rev() {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let j = (state >> 33) as usize % (i + 1);
        order.swap(i, j);
    }
    let test_count = ((rows.len() as f64) * test_fraction).round() as usize;
    let (test_idx, train_idx) = order.split_at(test_count.min(order.len()));

    let gather = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        (idx.iter().map(|&i| rows[i].clone()).collect(), idx.iter().map(|&i| targets[i]).collect())
    };
    let (test_rows, test_targets) = gather(test_idx);
    let (train_rows, train_targets) = gather(train_idx);
    (train_rows, train_targets, test_rows, test_targets)
}

fn cross_validate(rows: &[Vec<f64>], targets: &[f64], epochs: usize, lr: f64, folds: usize) -> Vec<f64> {
    if rows.len() < folds || folds == 0 {
        let model = LogisticRegression::train_linear(rows, targets, epochs, lr);
        let (mae, _, _) = evaluate(&model, rows, targets);
        return vec![mae];
    }
    let fold_size = rows.len() / folds;
    let mut scores = Vec::with_capacity(folds);
    for k in 0..folds {
        let start = k * fold_size;
        let end = if k == folds - 1 { rows.len() } else { start + fold_size };
        let (val_rows, val_targets): (Vec<_>, Vec<_>) =
            (rows[start..end].to_vec(), targets[start..end].to_vec());
        let mut train_rows = rows[..start].to_vec();
        train_rows.extend_from_slice(&rows[end..]);
        let mut train_targets = targets[..start].to_vec();
        train_targets.extend_from_slice(&targets[end..]);

        let model = LogisticRegression::train_linear(&train_rows, &train_targets, epochs, lr);
        let (mae, _, _) = evaluate(&model, &val_rows, &val_targets);
        scores.push(mae);
    }
    scores
}

fn evaluate(model: &LogisticRegression, rows: &[Vec<f64>], targets: &[f64]) -> (f64, f64, f64) {
    if rows.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let preds: Vec<f64> = rows.iter().map(|r| model.predict_linear(r)).collect();
    let n = targets.len() as f64;
    let mae = preds.iter().zip(targets).map(|(p, t)| (p - t).abs()).sum::<f64>() / n;
    let mse = preds.iter().zip(targets).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();
    let (target_mean, _) = mean_std(targets);
    let ss_tot: f64 = targets.iter().map(|t| (t - target_mean).powi(2)).sum();
    let ss_res: f64 = preds.iter().zip(targets).map(|(p, t)| (p - t).powi(2)).sum();
    let r2 = if ss_tot.abs() < 1e-9 { 0.0 } else { 1.0 - ss_res / ss_tot };
    (mae, rmse, r2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{TimeZone, Utc};

    #[derive(Debug)]
    struct NullLogger;
    impl InfoLogger for NullLogger {
        fn log(&self, _message: &str) {}
    }

    fn row(day: u32, duration: f64, tech: &str) -> HistoricalDispatch {
        HistoricalDispatch {
            dispatch_id: "h".into(),
            priority: Priority::Normal,
            required_skill: "fiber".into(),
            service_tier: Some("gold".into()),
            equipment_installed: Some(true),
            first_time_fix: Some(true),
            appointment_start: Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap(),
            appointment_end: Utc.with_ymd_and_hms(2026, 3, day, 10, 0, 0).unwrap(),
            customer_lat: None,
            customer_lon: None,
            city: Some("Newark".into()),
            state: "NJ".into(),
            expected_duration_min: 60.0,
            technician_skill: "fiber".into(),
            technician_id: tech.into(),
            productive: true,
            actual_duration_min: duration,
        }
    }

    fn sample_history() -> Vec<HistoricalDispatch> {
        (1..=20).map(|d| row(d, 50.0 + (d as f64), if d % 2 == 0 { "t1" } else { "t2" })).collect()
    }

    #[test]
    fn predicts_within_clip_bounds() {
        let history = sample_history();
        let table = SkillCompatibilityTable::empty();
        let predictor = DurationPredictor::train(&history, &table, &NullLogger);
        let inputs = DurationFeatureInputs {
            distance_km: Some(20.0),
            skill_match_score: 0.8,
            workload_ratio: 0.3,
            hour_of_day: 9,
            day_of_week: 1,
            is_weekend: false,
            first_time_fix: Some(true),
            service_tier: Some("gold"),
            equipment_installed: Some(true),
            technician_id: "t1",
            city: Some("Newark"),
        };
        let predicted = predictor.predict(&inputs);
        assert!(predicted >= predictor.clip_low - 1e-6 && predicted <= predictor.clip_high + 1e-6);
    }

    #[test]
    fn out_of_order_timestamps_trigger_warning() {
        let mut history = sample_history();
        history.swap(0, 10);
        let table = SkillCompatibilityTable::empty();

        #[derive(Debug, Default)]
        struct RecordingLogger(std::sync::Mutex<Vec<String>>);
        impl InfoLogger for RecordingLogger {
            fn log(&self, message: &str) {
                self.0.lock().unwrap().push(message.to_string());
            }
        }
        let logger = RecordingLogger::default();
        let _predictor = DurationPredictor::train(&history, &table, &logger);
        assert!(!logger.0.lock().unwrap().is_empty());
    }

    #[test]
    fn expanding_mean_never_leaks_current_row() {
        let history: Vec<&HistoricalDispatch> = Vec::new();
        let means = expanding_means(&history, |r| r.technician_id.clone());
        assert!(means.is_empty());
    }

    #[test]
    fn metrics_are_finite() {
        let history = sample_history();
        let table = SkillCompatibilityTable::empty();
        let predictor = DurationPredictor::train(&history, &table, &NullLogger);
        assert!(predictor.metrics.train_mae.is_finite());
        assert!(predictor.metrics.cv_mae_mean.is_finite());
    }
}
