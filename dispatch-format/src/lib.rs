//! Typed record schemas for the dispatch engine's external boundary (§6):
//! input row tables an ingest step deserializes into, and the assignment/
//! warning/diagnostic tables an exporter writes back out. Row types carry
//! every column as optional, mirroring an untrusted external record;
//! [`convert`] is where "missing required column" becomes an ingest error
//! rather than a panic deep in the engine.

pub mod convert;
pub mod input;
pub mod output;

pub use convert::{convert_calendar, convert_dispatches, convert_history, convert_technicians, FormatError};
pub use input::{CalendarRow, DispatchRow, HistoryRow, TechnicianRow};
pub use output::{assignment_rows, render_diagnostic_report, warning_rows, AssignmentRow, WarningRow};
