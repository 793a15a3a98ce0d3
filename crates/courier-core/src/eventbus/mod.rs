//! Addressed event bus with round-robin sends, broadcast publishes, and
//! request-reply correlation.
//!
//! - `bus` -- `EventBus` facade: registration, send, publish, request-reply
//! - `registry` -- `ConsumerRegistry` mapping addresses to consumers
//! - `consumer` -- `Consumer` and the `ConsumerHandle` returned to owners
//! - `dispatch` -- isolated handler invocation with fault capture
//! - `reply` -- once-only reply slot and reply address generation
//! - `sink` -- `LogSink` collaborator and the default `TracingSink`

pub mod bus;
pub mod consumer;
pub(crate) mod dispatch;
pub mod registry;
pub mod reply;
pub mod sink;

pub use bus::EventBus;
pub use consumer::{Consumer, ConsumerHandle, Handler};
pub use registry::ConsumerRegistry;
pub use reply::{REPLY_ADDRESS_PREFIX, ReplyCallback};
pub use sink::{LogSink, TracingSink};
