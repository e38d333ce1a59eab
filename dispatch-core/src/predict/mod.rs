//! C3/C4: trainable predictors and the feature engineering they share.

mod duration;
mod features;
mod success;

pub use duration::{DurationFeatureInputs, DurationMetrics, DurationPredictor};
pub use features::{LogisticRegression, MinMaxScaler, OneHotEncoder};
pub use success::{rule_based_probability, SuccessFeatureInputs, SuccessMode, SuccessPredictor, ENHANCED_MODE_MIN_ROWS};
