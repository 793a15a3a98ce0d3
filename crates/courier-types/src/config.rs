//! Bus configuration types for Courier.
//!
//! `BusConfig` represents the `config.toml` that controls bus-wide defaults.

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;
use crate::options::{DEFAULT_TIMEOUT_MS, DeliveryOptions};

/// Top-level configuration for an event bus instance.
///
/// Loaded from `~/.courier/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Reply timeout used when a call does not pass its own options.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

impl BusConfig {
    /// The delivery options implied by this config.
    pub fn delivery_options(&self) -> Result<DeliveryOptions, OptionsError> {
        DeliveryOptions::new().with_timeout_ms(self.default_timeout_ms)
    }
}
