//! Writes the Assignment table, the optional per-warning table, and the
//! optional diagnostic report (§6 Outputs). Table format follows the
//! output path's extension, same rule as ingest's CSV fallback path.
//!
//! Export failures aren't part of the §6/§7 exit-code contract (they can
//! only happen after a run has already succeeded), so they're plain
//! `anyhow` errors rather than `EngineError`.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use dispatch_core::RunResult;
use dispatch_format::{assignment_rows, render_diagnostic_report, warning_rows};
use serde::Serialize;

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let is_json = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let text = serde_json::to_string_pretty(rows).with_context(|| format!("serializing {}", path.display()))?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    } else {
        let mut writer = csv::Writer::from_path(path).with_context(|| format!("opening {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush().with_context(|| format!("flushing {}", path.display()))
    }
}

pub fn export_assignments(path: &Path, result: &RunResult) -> Result<()> {
    let rows = assignment_rows(&result.outcomes, Utc::now());
    write_rows(path, &rows)
}

pub fn export_warnings(path: &Path, result: &RunResult) -> Result<()> {
    let rows = warning_rows(&result.outcomes);
    write_rows(path, &rows)
}

pub fn export_report(path: &Path, result: &RunResult) -> Result<()> {
    let report = render_diagnostic_report(result);
    std::fs::write(path, report).with_context(|| format!("writing {}", path.display()))
}
