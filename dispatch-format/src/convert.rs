//! Row -> model validation (§7 "Ingest error"). A missing required column
//! or a malformed appointment window (`appointment_end < appointment_start`)
//! both fail ingest here; every other semantic invariant is left to the
//! engine, which already treats it as a warning or per-dispatch non-match
//! rather than an ingest failure.

use dispatch_core::models::{CalendarEntry, Dispatch, HistoricalDispatch, Technician};
use thiserror::Error;

use crate::input::{CalendarRow, DispatchRow, HistoryRow, TechnicianRow};

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("{table} row missing required column `{column}`")]
    MissingColumn { table: &'static str, column: &'static str },
    #[error("{table} row `{dispatch_id}` has appointment_end before appointment_start")]
    InvalidWindow { table: &'static str, dispatch_id: String },
}

macro_rules! require {
    ($table:expr, $row:expr, $field:ident) => {
        $row.$field.clone().ok_or(FormatError::MissingColumn { table: $table, column: stringify!($field) })?
    };
}

fn dispatch_from_row(row: DispatchRow) -> Result<Dispatch, FormatError> {
    const TABLE: &str = "dispatches";
    let dispatch = Dispatch {
        dispatch_id: require!(TABLE, row, dispatch_id),
        priority: require!(TABLE, row, priority),
        required_skill: require!(TABLE, row, required_skill),
        service_tier: row.service_tier,
        equipment_installed: row.equipment_installed,
        first_time_fix: row.first_time_fix,
        appointment_start: require!(TABLE, row, appointment_start),
        appointment_end: require!(TABLE, row, appointment_end),
        customer_lat: row.customer_lat,
        customer_lon: row.customer_lon,
        city: row.city,
        state: require!(TABLE, row, state),
        expected_duration_min: require!(TABLE, row, expected_duration),
        assigned_technician_id: row.assigned_technician_id,
    };
    if !dispatch.has_valid_window() {
        return Err(FormatError::InvalidWindow { table: TABLE, dispatch_id: dispatch.dispatch_id });
    }
    Ok(dispatch)
}

fn technician_from_row(row: TechnicianRow) -> Result<Technician, FormatError> {
    const TABLE: &str = "technicians";
    Ok(Technician {
        technician_id: require!(TABLE, row, technician_id),
        primary_skill: require!(TABLE, row, primary_skill),
        tech_lat: row.tech_lat,
        tech_lon: row.tech_lon,
        city: row.city,
        state: require!(TABLE, row, state),
        workload_capacity: require!(TABLE, row, workload_capacity),
        current_assignments: require!(TABLE, row, current_assignments),
    })
}

fn calendar_from_row(row: CalendarRow) -> Result<CalendarEntry, FormatError> {
    const TABLE: &str = "calendar";
    Ok(CalendarEntry {
        technician_id: require!(TABLE, row, technician_id),
        date: require!(TABLE, row, date),
        available: require!(TABLE, row, available),
        shift_start: require!(TABLE, row, shift_start),
        shift_end: require!(TABLE, row, shift_end),
        max_assignments: require!(TABLE, row, max_assignments),
    })
}

fn history_from_row(row: HistoryRow) -> Result<HistoricalDispatch, FormatError> {
    const TABLE: &str = "history";
    Ok(HistoricalDispatch {
        dispatch_id: require!(TABLE, row, dispatch_id),
        priority: require!(TABLE, row, priority),
        required_skill: require!(TABLE, row, required_skill),
        service_tier: row.service_tier,
        equipment_installed: row.equipment_installed,
        first_time_fix: row.first_time_fix,
        appointment_start: require!(TABLE, row, appointment_start),
        appointment_end: require!(TABLE, row, appointment_end),
        customer_lat: row.customer_lat,
        customer_lon: row.customer_lon,
        city: row.city,
        state: require!(TABLE, row, state),
        expected_duration_min: require!(TABLE, row, expected_duration),
        technician_skill: require!(TABLE, row, technician_skill),
        technician_id: require!(TABLE, row, technician_id),
        productive: require!(TABLE, row, productive),
        actual_duration_min: require!(TABLE, row, actual_duration_min),
    })
}

/// Converts every row, failing on the first invalid one. Ingest is
/// all-or-nothing per §7: "no assignments written" on an ingest error.
pub fn convert_dispatches(rows: Vec<DispatchRow>) -> Result<Vec<Dispatch>, FormatError> {
    rows.into_iter().map(dispatch_from_row).collect()
}

pub fn convert_technicians(rows: Vec<TechnicianRow>) -> Result<Vec<Technician>, FormatError> {
    rows.into_iter().map(technician_from_row).collect()
}

pub fn convert_calendar(rows: Vec<CalendarRow>) -> Result<Vec<CalendarEntry>, FormatError> {
    rows.into_iter().map(calendar_from_row).collect()
}

pub fn convert_history(rows: Vec<HistoryRow>) -> Result<Vec<HistoricalDispatch>, FormatError> {
    rows.into_iter().map(history_from_row).collect()
}
