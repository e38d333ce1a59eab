//! Row schemas for the four input tables in §6. Every column is optional
//! here regardless of whether it is "required" in the data model, since a
//! row freshly deserialized from CSV or a database cursor has not yet been
//! validated; [`crate::convert`] is where required-column checks happen.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dispatch_core::models::Priority;
use serde::{Deserialize, Serialize};

/// One row of the Dispatches table. Required columns per §6:
/// `dispatch_id, priority, required_skill, appointment_start,
/// appointment_end, customer_lat, customer_lon, state, expected_duration`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DispatchRow {
    pub dispatch_id: Option<String>,
    pub priority: Option<Priority>,
    pub required_skill: Option<String>,
    pub service_tier: Option<String>,
    pub equipment_installed: Option<bool>,
    pub first_time_fix: Option<bool>,
    pub appointment_start: Option<DateTime<Utc>>,
    pub appointment_end: Option<DateTime<Utc>>,
    pub customer_lat: Option<f64>,
    pub customer_lon: Option<f64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub expected_duration: Option<f64>,
    pub assigned_technician_id: Option<String>,
}

/// One row of the Technicians table. Required columns per §6:
/// `technician_id, primary_skill, tech_lat, tech_lon, state, city,
/// workload_capacity, current_assignments`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TechnicianRow {
    pub technician_id: Option<String>,
    pub primary_skill: Option<String>,
    pub tech_lat: Option<f64>,
    pub tech_lon: Option<f64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub workload_capacity: Option<u32>,
    pub current_assignments: Option<u32>,
}

/// One row of the Calendar table. Every column is required per §6.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalendarRow {
    pub technician_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub available: Option<bool>,
    pub shift_start: Option<NaiveTime>,
    pub shift_end: Option<NaiveTime>,
    pub max_assignments: Option<u32>,
}

/// One row of the History table: the Dispatches columns plus the
/// technician that handled it, the technician's skill at the time, and the
/// realized outcome (`productive, actual_duration_min`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryRow {
    pub dispatch_id: Option<String>,
    pub priority: Option<Priority>,
    pub required_skill: Option<String>,
    pub service_tier: Option<String>,
    pub equipment_installed: Option<bool>,
    pub first_time_fix: Option<bool>,
    pub appointment_start: Option<DateTime<Utc>>,
    pub appointment_end: Option<DateTime<Utc>>,
    pub customer_lat: Option<f64>,
    pub customer_lon: Option<f64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub expected_duration: Option<f64>,
    pub technician_id: Option<String>,
    pub technician_skill: Option<String>,
    pub productive: Option<bool>,
    pub actual_duration_min: Option<f64>,
}
