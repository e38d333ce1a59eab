//! `dispatch-cli`: reads the four input tables, runs the engine (C1-C10),
//! and writes the Assignment table plus the optional warnings/report
//! outputs. Exit codes follow §6/§7 exactly (see `dispatch_core::EngineError`).

mod cli;
mod config;
mod export;
mod ingest;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;
use crate::logging::TracingLogger;

fn run(cli: &Cli) -> Result<()> {
    let file_config = cli.config.as_ref().map(|path| config::load_file_config(path)).transpose()?;
    let run_config = config::build_run_config(cli, file_config.as_ref())?;

    let dispatches = ingest::load_dispatches(&cli.dispatches)?;
    let technicians = ingest::load_technicians(&cli.technicians)?;
    let calendar = ingest::load_calendar(&cli.calendar)?;
    let history = ingest::load_history(cli.history.as_deref())?;

    let logger: Arc<dyn dispatch_core::prelude::InfoLogger> = Arc::new(TracingLogger);
    let result = dispatch_core::run(&dispatches, technicians, &calendar, &history, run_config, logger)?;

    export::export_assignments(&cli.output, &result)?;
    if let Some(path) = &cli.warnings_output {
        export::export_warnings(path, &result)?;
    }
    if let Some(path) = &cli.report_output {
        export::export_report(path, &result)?;
    }

    tracing::info!(
        assigned = result.optimized_diagnostics.assigned_count,
        total = result.optimized_diagnostics.dispatch_count,
        partial = result.partial,
        "run complete"
    );
    Ok(())
}

/// `EngineError`'s documented exit code when the failure came from the
/// engine itself; any other error (a TOML parse failure, a write failure
/// after a successful run) exits 1, same as a fatal config error.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<dispatch_core::EngineError>() {
        Some(engine_err) => engine_err.exit_code() as u8,
        None => 1,
    }
}

/// §7's "dump state" on a post-commit hard-constraint violation: the
/// `AssignmentStore` snapshot already embedded in the error's message is
/// written to `report_output` if one was configured, and always to
/// stderr, so it survives independently of whatever the tracing
/// subscriber's level filters out.
fn dump_hard_constraint_state(cli: &Cli, err: &anyhow::Error) {
    let Some(dispatch_core::EngineError::HardConstraintViolated(detail)) = err.downcast_ref::<dispatch_core::EngineError>() else {
        return;
    };
    eprintln!("FATAL: hard constraint violated post-commit, dumping state:\n{detail}");
    if let Some(path) = &cli.report_output {
        if let Err(write_err) = std::fs::write(path, detail) {
            eprintln!("failed to write hard-constraint state dump to {}: {write_err}", path.display());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install tracing subscriber");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            dump_hard_constraint_state(&cli, &err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}
