use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A technician's availability for a single date. Only `available = true`
/// entries participate in scheduling; a technician with no entry for a date
/// is unassignable on it, a hard constraint never relaxed by the fallback
/// ladder (C8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub technician_id: String,
    pub date: NaiveDate,
    pub available: bool,
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub max_assignments: u32,
}

impl CalendarEntry {
    /// `shift_start < shift_end`, required for the entry to be usable.
    pub fn has_valid_shift(&self) -> bool {
        self.shift_start < self.shift_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_invalid_shift() {
        let entry = CalendarEntry {
            technician_id: "t1".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
            available: true,
            shift_start: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            shift_end: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            max_assignments: 5,
        };
        assert!(!entry.has_valid_shift());
    }
}
