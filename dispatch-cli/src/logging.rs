//! Tracing-backed `InfoLogger`, per the trait's own doc comment: "a run
//! driver supplies an implementation backed by `tracing`".

use dispatch_core::prelude::InfoLogger;

#[derive(Debug)]
pub struct TracingLogger;

impl InfoLogger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!("{message}");
    }
}
