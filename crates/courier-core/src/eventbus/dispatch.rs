//! Isolated handler invocation.
//!
//! Handlers are plain synchronous functions, so every call runs on Tokio's
//! blocking pool. A slow handler never holds a runtime worker (or the timer on
//! a current-thread runtime), and a returned error or a panic is captured as a
//! [`HandlerFault`] instead of unwinding into the bus or into other consumers'
//! deliveries.

use std::any::Any;
use std::sync::Arc;

use courier_types::{Envelope, HandlerFault};

use super::consumer::Consumer;
use super::sink::LogSink;

/// How a single dispatch resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// A consumer existed and its handler ran without fault.
    Delivered,
    /// No consumer (or no handler) was available.
    NoConsumer,
    /// The handler faulted; the fault has already been logged.
    Faulted(HandlerFault),
}

/// Run `work` on the blocking pool and translate failure into a fault.
pub(crate) async fn isolate<F>(work: F) -> Result<(), HandlerFault>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(HandlerFault::Failed(format!("{err:#}"))),
        Err(err) if err.is_panic() => Err(HandlerFault::Panicked(panic_message(err.into_panic()))),
        Err(err) => Err(HandlerFault::Failed(err.to_string())),
    }
}

/// Deliver `envelope` to `consumer`, logging any fault to `sink`.
pub(crate) async fn invoke(
    consumer: Arc<Consumer>,
    envelope: Envelope,
    sink: Arc<dyn LogSink>,
) -> Dispatch {
    let Some(handler) = consumer.handler() else {
        return Dispatch::NoConsumer;
    };

    let address = envelope.address().to_string();
    let envelope_id = envelope.id();

    match isolate(move || handler(envelope)).await {
        Ok(()) => {
            tracing::trace!(%address, %envelope_id, consumer_id = %consumer.id(), "handler completed");
            Dispatch::Delivered
        }
        Err(fault) => {
            sink.error(
                &format!("consumer {} at {address} faulted on envelope {envelope_id}", consumer.id()),
                &fault,
            );
            Dispatch::Faulted(fault)
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
