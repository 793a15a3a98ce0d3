use std::time::Duration;

use thiserror::Error;

/// Failures surfaced to reply callbacks as `Outcome::Failure`.
///
/// Plain sends and publishes never return these to the caller; they only
/// reach the bus's log sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// A send targeted an address with no registered consumer.
    #[error("no consumer at {address}")]
    NoConsumer { address: String },

    /// Nothing resolved the request before its deadline.
    #[error("timeout after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// The selected consumer's handler faulted while processing the message.
    #[error("{0}")]
    HandlerFault(#[from] HandlerFault),
}

impl BusError {
    pub fn no_consumer(address: impl Into<String>) -> Self {
        Self::NoConsumer {
            address: address.into(),
        }
    }

    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    pub fn is_no_consumer(&self) -> bool {
        matches!(self, Self::NoConsumer { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_handler_fault(&self) -> bool {
        matches!(self, Self::HandlerFault(_))
    }
}

/// A fault raised by a consumer handler during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFault {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Invalid delivery option values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("delivery timeout must be greater than zero")]
    ZeroTimeout,
}
