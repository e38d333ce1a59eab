//! Overlap test and the Critical/High priority exception, shared by C8's
//! fallback ladder and C9's swap evaluation.

use chrono::{DateTime, Duration, Utc};

use crate::models::Priority;

/// Two windows overlap once a `buffer_minutes` cushion is applied to both
/// sides: `a.start < b.end + buffer && a.end + buffer > b.start`.
pub fn overlaps(a_start: DateTime<Utc>, a_end: DateTime<Utc>, b_start: DateTime<Utc>, b_end: DateTime<Utc>, buffer_minutes: i64) -> bool {
    let buffer = Duration::minutes(buffer_minutes);
    a_start < b_end + buffer && a_end + buffer > b_start
}

/// The minimum success-score lead a Critical/High dispatch needs over the
/// best non-overlapping candidate to be placed against an otherwise
/// overlapping slot (L0-L2 only). `None` for Normal/Low, which never get
/// the exception.
pub fn priority_exception_delta(priority: Priority) -> Option<f64> {
    match priority {
        Priority::Critical => Some(0.20),
        Priority::High => Some(0.25),
        Priority::Normal | Priority::Low => None,
    }
}
