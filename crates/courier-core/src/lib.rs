//! Dispatch core for Courier, an in-process addressed event bus.
//!
//! This crate owns the consumer registry, the send/publish dispatch paths and
//! the reply-correlation race. It depends only on `courier-types` plus the
//! async runtime -- never on `courier-infra` or any config or logging setup.

pub mod eventbus;

pub use eventbus::{ConsumerHandle, EventBus, LogSink, TracingSink};
