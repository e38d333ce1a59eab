//! Reads the four input tables from CSV or JSON (§6 "CSV fallback path"),
//! then hands them to `dispatch-format::convert::*` to become typed models.
//! A missing required column becomes an `EngineError::Ingest`, never a
//! panic; a missing *file* is an ingest error too, not a config error,
//! since the table's shape is still the caller's to fix before rerunning.

use std::path::Path;

use dispatch_core::models::{CalendarEntry, Dispatch, HistoricalDispatch, Technician};
use dispatch_core::EngineError;
use dispatch_format::{convert_calendar, convert_dispatches, convert_history, convert_technicians, CalendarRow, DispatchRow, FormatError, HistoryRow, TechnicianRow};
use serde::de::DeserializeOwned;

fn to_ingest_error(path: &Path, err: impl std::fmt::Display) -> EngineError {
    EngineError::Ingest(format!("{}: {err}", path.display()))
}

fn format_error_to_ingest(path: &Path, err: FormatError) -> EngineError {
    EngineError::Ingest(format!("{}: {err}", path.display()))
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, EngineError> {
    let is_json = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let text = std::fs::read_to_string(path).map_err(|e| to_ingest_error(path, e))?;
        serde_json::from_str(&text).map_err(|e| to_ingest_error(path, e))
    } else {
        let mut reader = csv::Reader::from_path(path).map_err(|e| to_ingest_error(path, e))?;
        reader.deserialize().collect::<Result<Vec<T>, _>>().map_err(|e| to_ingest_error(path, e))
    }
}

pub fn load_dispatches(path: &Path) -> Result<Vec<Dispatch>, EngineError> {
    let rows: Vec<DispatchRow> = read_rows(path)?;
    convert_dispatches(rows).map_err(|e| format_error_to_ingest(path, e))
}

pub fn load_technicians(path: &Path) -> Result<Vec<Technician>, EngineError> {
    let rows: Vec<TechnicianRow> = read_rows(path)?;
    convert_technicians(rows).map_err(|e| format_error_to_ingest(path, e))
}

pub fn load_calendar(path: &Path) -> Result<Vec<CalendarEntry>, EngineError> {
    let rows: Vec<CalendarRow> = read_rows(path)?;
    convert_calendar(rows).map_err(|e| format_error_to_ingest(path, e))
}

pub fn load_history(path: Option<&Path>) -> Result<Vec<HistoricalDispatch>, EngineError> {
    let Some(path) = path else { return Ok(Vec::new()) };
    let rows: Vec<HistoryRow> = read_rows(path)?;
    convert_history(rows).map_err(|e| format_error_to_ingest(path, e))
}
