//! Consumers and the handles returned to their owners.

use std::sync::{Arc, PoisonError, RwLock};

use courier_types::Envelope;
use uuid::Uuid;

use super::registry::ConsumerRegistry;

/// A consumer's message handler.
///
/// Handlers run on Tokio's blocking pool. Returning `Err` (or panicking) is a
/// handler fault: it is reported to the bus's log sink and, for requests,
/// surfaced to the requester. It never reaches the sender directly.
pub type Handler = Arc<dyn Fn(Envelope) -> anyhow::Result<()> + Send + Sync>;

/// A handler registered at one address.
///
/// The handler may be attached after registration. Until it is, the consumer
/// is visible to selection but dispatch treats it as absent.
pub struct Consumer {
    id: Uuid,
    address: String,
    handler: RwLock<Option<Handler>>,
}

impl Consumer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            address: address.into(),
            handler: RwLock::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Replace the handler.
    pub fn set_handler(&self, handler: Handler) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Clone out the current handler, if one is attached.
    pub fn handler(&self) -> Option<Handler> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("has_handler", &self.handler().is_some())
            .finish()
    }
}

/// Owner-side handle to a registered consumer.
///
/// Dropping the handle does not unregister the consumer; call
/// [`ConsumerHandle::unregister`] (or `EventBus::unregister`) for that.
#[derive(Clone)]
pub struct ConsumerHandle {
    consumer: Arc<Consumer>,
    registry: Arc<ConsumerRegistry>,
}

impl ConsumerHandle {
    pub(crate) fn new(consumer: Arc<Consumer>, registry: Arc<ConsumerRegistry>) -> Self {
        Self { consumer, registry }
    }

    pub fn id(&self) -> Uuid {
        self.consumer.id()
    }

    pub fn address(&self) -> &str {
        self.consumer.address()
    }

    /// Attach (or replace) the handler.
    pub fn handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(Envelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.consumer.set_handler(Arc::new(handler));
        self
    }

    /// Remove the consumer from its address.
    ///
    /// Returns `true` if it was still registered. Calling this again is a no-op.
    pub fn unregister(&self) -> bool {
        self.registry
            .unregister(self.consumer.address(), self.consumer.id())
    }

    /// Whether the consumer is still registered at its address.
    pub fn is_registered(&self) -> bool {
        self.registry
            .contains(self.consumer.address(), self.consumer.id())
    }
}

impl std::fmt::Debug for ConsumerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerHandle")
            .field("id", &self.consumer.id())
            .field("address", &self.consumer.address())
            .finish()
    }
}
