use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Dispatch urgency. Declaration order doubles as rank order: `Critical` is
/// the lowest (best) sort key, matching the greedy loop's
/// `(priority_rank, appointment_start)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

impl Priority {
    /// `0` for `Critical` through `3` for `Low`.
    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// An immutable input appointment awaiting a technician. All coordinates are
/// optional because an incomplete geocode is a valid (if degraded) input
/// row, not an ingest error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
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
    pub assigned_technician_id: Option<String>,
}

impl Dispatch {
    /// Scheduling date: the calendar date of `appointment_start`, used to
    /// look up a technician's availability for this dispatch.
    pub fn date(&self) -> NaiveDate {
        self.appointment_start.date_naive()
    }

    /// Whether the appointment window is well-formed (`start <= end`).
    pub fn has_valid_window(&self) -> bool {
        self.appointment_start <= self.appointment_end
    }

    /// Appointment duration, independent of `expected_duration_min`.
    pub fn window_minutes(&self) -> f64 {
        (self.appointment_end - self.appointment_start).num_seconds() as f64 / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dispatch_at(start_hour: u32, end_hour: u32) -> Dispatch {
        Dispatch {
            dispatch_id: "d1".into(),
            priority: Priority::Normal,
            required_skill: "fiber".into(),
            service_tier: None,
            equipment_installed: None,
            first_time_fix: None,
            appointment_start: Utc.with_ymd_and_hms(2026, 3, 5, start_hour, 0, 0).unwrap(),
            appointment_end: Utc.with_ymd_and_hms(2026, 3, 5, end_hour, 0, 0).unwrap(),
            customer_lat: Some(40.0),
            customer_lon: Some(-74.0),
            city: Some("Newark".into()),
            state: "NJ".into(),
            expected_duration_min: 60.0,
            assigned_technician_id: None,
        }
    }

    #[test]
    fn priority_rank_orders_critical_first() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Normal);
        assert!(Priority::Normal < Priority::Low);
        assert_eq!(Priority::Critical.rank(), 0);
        assert_eq!(Priority::Low.rank(), 3);
    }

    #[test]
    fn detects_invalid_window() {
        let d = dispatch_at(10, 9);
        assert!(!d.has_valid_window());
    }

    #[test]
    fn computes_window_minutes() {
        let d = dispatch_at(9, 10);
        assert_eq!(d.window_minutes(), 60.0);
    }
}
