use serde::{Deserialize, Serialize};

/// A field worker. `current_assignments` is the only mutable counter in the
/// data model, owned exclusively by `solver::store::AssignmentStore` once a
/// run starts; this struct is the immutable snapshot handed to candidate
/// filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub technician_id: String,
    pub primary_skill: String,
    pub tech_lat: Option<f64>,
    pub tech_lon: Option<f64>,
    pub city: Option<String>,
    pub state: String,
    pub workload_capacity: u32,
    pub current_assignments: u32,
}

impl Technician {
    /// `current_assignments / workload_capacity`. Capacity is guaranteed
    /// `>= 1` by ingest validation, so this never divides by zero.
    pub fn workload_ratio(&self) -> f64 {
        self.current_assignments as f64 / self.workload_capacity.max(1) as f64
    }

    /// Workload ratio as if one more assignment were committed.
    pub fn workload_ratio_after(&self, extra: u32) -> f64 {
        (self.current_assignments + extra) as f64 / self.workload_capacity.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech(capacity: u32, current: u32) -> Technician {
        Technician {
            technician_id: "t1".into(),
            primary_skill: "fiber".into(),
            tech_lat: Some(40.0),
            tech_lon: Some(-74.0),
            city: Some("Newark".into()),
            state: "NJ".into(),
            workload_capacity: capacity,
            current_assignments: current,
        }
    }

    #[test]
    fn computes_workload_ratio() {
        let t = tech(8, 1);
        assert_eq!(t.workload_ratio(), 0.125);
        assert_eq!(t.workload_ratio_after(1), 0.25);
    }
}
