//! Per-call delivery options.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::OptionsError;

/// Default reply timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Options carried by a single send, request, or publish.
///
/// The timeout only matters for requests: it bounds how long the ephemeral
/// reply consumer stays registered. Headers are copied onto the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOptions {
    timeout: Duration,
    headers: BTreeMap<String, String>,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            headers: BTreeMap::new(),
        }
    }
}

impl DeliveryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reply timeout. Zero is rejected.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, OptionsError> {
        if timeout.is_zero() {
            return Err(OptionsError::ZeroTimeout);
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Set the reply timeout in milliseconds. Zero is rejected.
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Result<Self, OptionsError> {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Add a header that will be copied onto the envelope.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}
