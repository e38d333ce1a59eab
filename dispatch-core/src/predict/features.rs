//! Shared preprocessing for C3/C4: min-max scaling and one-hot encoding
//! with an explicit "unknown" bucket, per spec §4.3/§4.4.

use hashbrown::HashSet;

pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Neutral imputed value for a missing numeric feature after scaling: a
/// canonical midpoint rather than zero, since zero is itself a meaningful
/// scaled value (the feature's observed minimum).
pub const MISSING_NUMERIC_FILL: f64 = 0.5;

/// Fits a `[min, max] -> [0, 1]` scale from training data and applies it
/// to future values, clamping out-of-range inputs rather than extrapolating.
#[derive(Debug, Clone, Copy)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in values {
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            }
        }
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        Self { min, max }
    }

    pub fn transform(&self, x: f64) -> f64 {
        if (self.max - self.min).abs() < 1e-12 {
            return MISSING_NUMERIC_FILL;
        }
        ((x - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    pub fn transform_option(&self, x: Option<f64>) -> f64 {
        x.map(|v| self.transform(v)).unwrap_or(MISSING_NUMERIC_FILL)
    }
}

/// One-hot encoder over a fixed training-time vocabulary, plus an implicit
/// final "unknown" column for values never seen during training (or absent).
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut set: HashSet<String> = HashSet::new();
        for v in values {
            set.insert(v.to_string());
        }
        let mut categories: Vec<String> = set.into_iter().collect();
        categories.sort();
        Self { categories }
    }

    /// Number of output columns, including the trailing "unknown" bucket.
    pub fn width(&self) -> usize {
        self.categories.len() + 1
    }

    pub fn encode_into(&self, value: Option<&str>, out: &mut Vec<f64>) {
        let idx = value.and_then(|v| self.categories.iter().position(|c| c == v));
        for i in 0..self.categories.len() {
            out.push(if idx == Some(i) { 1.0 } else { 0.0 });
        }
        out.push(if idx.is_none() { 1.0 } else { 0.0 });
    }
}

/// Additive logistic-regression model trained by batch gradient descent.
/// Scores features, outputs a calibrated probability, and degrades to a
/// numeric-only fallback when untrained.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticRegression {
    pub fn train(features: &[Vec<f64>], labels: &[f64], epochs: usize, learning_rate: f64) -> Self {
        let dim = features.first().map_or(0, Vec::len);
        let mut weights = vec![0.0; dim];
        let mut bias = 0.0;
        let n = features.len().max(1) as f64;

        for _ in 0..epochs {
            let mut grad_w = vec![0.0; dim];
            let mut grad_b = 0.0;
            for (x, &y) in features.iter().zip(labels) {
                let p = sigmoid(dot(&weights, x) + bias);
                let err = p - y;
                for i in 0..dim {
                    grad_w[i] += err * x[i];
                }
                grad_b += err;
            }
            for i in 0..dim {
                weights[i] -= learning_rate * grad_w[i] / n;
            }
            bias -= learning_rate * grad_b / n;
        }

        Self { weights, bias }
    }

    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(dot(&self.weights, x) + self.bias)
    }

    /// Trains a linear (identity-link) regressor by the same descent loop,
    /// reused by the duration predictor.
    pub fn train_linear(features: &[Vec<f64>], targets: &[f64], epochs: usize, learning_rate: f64) -> Self {
        let dim = features.first().map_or(0, Vec::len);
        let mut weights = vec![0.0; dim];
        let mut bias = targets.iter().sum::<f64>() / targets.len().max(1) as f64;

        for _ in 0..epochs {
            let mut grad_w = vec![0.0; dim];
            let mut grad_b = 0.0;
            for (x, &y) in features.iter().zip(targets) {
                let pred = dot(&weights, x) + bias;
                let err = pred - y;
                for i in 0..dim {
                    grad_w[i] += err * x[i];
                }
                grad_b += err;
            }
            let n = targets.len().max(1) as f64;
            for i in 0..dim {
                weights[i] -= learning_rate * grad_w[i] / n;
            }
            bias -= learning_rate * grad_b / n;
        }

        Self { weights, bias }
    }

    pub fn predict_linear(&self, x: &[f64]) -> f64 {
        dot(&self.weights, x) + self.bias
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Population mean and standard deviation, used by C4's z-score outlier
/// filter.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

/// The `p`-th percentile (0..=100) of `values` by nearest-rank on a sorted
/// copy. Used to clip duration predictions to `[p01, p99]`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaler_maps_range_to_unit_interval() {
        let scaler = MinMaxScaler::fit(&[10.0, 20.0, 30.0]);
        assert_eq!(scaler.transform(10.0), 0.0);
        assert_eq!(scaler.transform(30.0), 1.0);
        assert_eq!(scaler.transform(20.0), 0.5);
    }

    #[test]
    fn scaler_clamps_out_of_range() {
        let scaler = MinMaxScaler::fit(&[0.0, 10.0]);
        assert_eq!(scaler.transform(-5.0), 0.0);
        assert_eq!(scaler.transform(50.0), 1.0);
    }

    #[test]
    fn scaler_handles_degenerate_range() {
        let scaler = MinMaxScaler::fit(&[5.0, 5.0, 5.0]);
        assert_eq!(scaler.transform(5.0), MISSING_NUMERIC_FILL);
    }

    #[test]
    fn missing_numeric_uses_midpoint_fill() {
        let scaler = MinMaxScaler::fit(&[0.0, 100.0]);
        assert_eq!(scaler.transform_option(None), MISSING_NUMERIC_FILL);
    }

    #[test]
    fn one_hot_encodes_known_and_unknown() {
        let encoder = OneHotEncoder::fit(["gold", "silver"].into_iter());
        assert_eq!(encoder.width(), 3);

        let mut out = Vec::new();
        encoder.encode_into(Some("gold"), &mut out);
        assert_eq!(out.iter().filter(|&&v| v == 1.0).count(), 1);

        let mut out = Vec::new();
        encoder.encode_into(Some("platinum"), &mut out);
        assert_eq!(out, vec![0.0, 0.0, 1.0]);

        let mut out = Vec::new();
        encoder.encode_into(None, &mut out);
        assert_eq!(*out.last().unwrap(), 1.0);
    }

    #[test]
    fn logistic_regression_separates_linearly_separable_data() {
        let features = vec![vec![0.0], vec![0.1], vec![0.9], vec![1.0]];
        let labels = vec![0.0, 0.0, 1.0, 1.0];
        let model = LogisticRegression::train(&features, &labels, 500, 0.5);
        assert!(model.predict_proba(&[1.0]) > model.predict_proba(&[0.0]));
    }

    #[test]
    fn percentile_clips_extremes() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert!(percentile(&values, 1.0) <= 5.0);
        assert!(percentile(&values, 99.0) >= 95.0);
    }

    #[test]
    fn mean_std_matches_known_values() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-9);
        assert!((std - 2.0).abs() < 1e-9);
    }
}
