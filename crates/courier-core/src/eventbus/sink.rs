//! The logging collaborator the bus reports to.
//!
//! The bus never decides how its log lines are stored or formatted. It only
//! needs somewhere to put informational messages and handler faults; embedders
//! inject their own `LogSink` or use the default `TracingSink`.

use std::error::Error;

/// Leveled log output used by the bus.
pub trait LogSink: Send + Sync {
    /// Record an informational message.
    fn info(&self, message: &str);

    /// Record a failure together with its cause.
    fn error(&self, message: &str, cause: &dyn Error);
}

/// Default sink: forwards to `tracing` under the `courier::bus` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "courier::bus", "{message}");
    }

    fn error(&self, message: &str, cause: &dyn Error) {
        tracing::error!(target: "courier::bus", error = %cause, "{message}");
    }
}
