use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dispatch::Priority;

/// A past dispatch with its realized outcome. Immutable for the duration of
/// a run; consumed only while training C2/C3/C4, never during assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDispatch {
    pub dispatch_id: String,
    pub priority: Priority,
    pub required_skill: String,
    pub service_tier: Option<String>,
    pub equipment_installed: Option<bool>,
    pub first_time_fix: Option<bool>,
    pub appointment_start: DateTime<Utc>,
    pub appointment_end: DateTime<Utc>,
    pub customer_lat: Option<f64>,
    pub customer_lon: Option<f64>,
    pub city: Option<String>,
    pub state: String,
    pub expected_duration_min: f64,
    /// The technician's primary skill *at the time of the dispatch*, which
    /// may differ from their current primary skill.
    pub technician_skill: String,
    pub technician_id: String,
    pub productive: bool,
    pub actual_duration_min: f64,
}

impl HistoricalDispatch {
    pub fn hour_of_day(&self) -> u32 {
        use chrono::Timelike;
        self.appointment_start.hour()
    }

    pub fn day_of_week(&self) -> u32 {
        use chrono::Datelike;
        self.appointment_start.weekday().num_days_from_monday()
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week() >= 5
    }
}
