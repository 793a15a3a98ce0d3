//! Shared types for the Courier event bus.
//!
//! This crate contains the values that flow through the bus: the immutable
//! `Envelope`, per-call `DeliveryOptions`, the `Outcome` handed to reply
//! callbacks, the bus error taxonomy, and the `BusConfig` file format.
//!
//! Zero runtime dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod envelope;
pub mod error;
pub mod options;
pub mod outcome;

pub use config::BusConfig;
pub use envelope::Envelope;
pub use error::{BusError, HandlerFault, OptionsError};
pub use options::DeliveryOptions;
pub use outcome::Outcome;
