//! Addressed event bus with point-to-point sends, broadcast publishes, and
//! request-reply over generated reply addresses.
//!
//! The `EventBus` is the runtime hub. Consumers register at string addresses;
//! `send` delivers to one of them (round robin), `publish` to all of them.
//! `request` additionally registers an ephemeral consumer at a fresh reply
//! address and races the dispatch against a deadline. The caller's callback
//! sees at most one failure from that race and at most one reply.
//!
//! None of the public operations block: they take a short registry lock and
//! spawn Tokio tasks, so they must be called from inside a Tokio runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use courier_types::{
    BusConfig, BusError, DeliveryOptions, Envelope, HandlerFault, OptionsError, Outcome,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use super::consumer::{Consumer, ConsumerHandle};
use super::dispatch::{self, Dispatch};
use super::registry::ConsumerRegistry;
use super::reply::{ReplyAddresses, ReplySlot};
use super::sink::{LogSink, TracingSink};

/// In-process addressed event bus.
///
/// Provides three delivery modes:
/// - **Send:** one consumer per message, rotating across the address.
/// - **Publish:** every consumer at the address, each isolated from the others.
/// - **Request:** a send whose callback receives the first reply, plus a
///   failure if nobody is listening or the handler faults. A handler still
///   running at the deadline without having replied yields a timeout.
pub struct EventBus {
    registry: Arc<ConsumerRegistry>,
    sink: Arc<dyn LogSink>,
    /// Options used when a call does not pass its own.
    defaults: DeliveryOptions,
    reply_addresses: ReplyAddresses,
    /// Ephemeral reply consumers still inside their window.
    pending_replies: Arc<AtomicUsize>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }
}

impl EventBus {
    /// Create a bus that logs through `tracing` and uses default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus that reports to the given log sink.
    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            registry: Arc::new(ConsumerRegistry::new()),
            sink,
            defaults: DeliveryOptions::default(),
            reply_addresses: ReplyAddresses::default(),
            pending_replies: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a bus from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured default timeout is zero.
    pub fn with_config(config: &BusConfig, sink: Arc<dyn LogSink>) -> Result<Self, OptionsError> {
        let defaults = config.delivery_options()?;
        Ok(Self {
            defaults,
            ..Self::with_sink(sink)
        })
    }

    /// The options applied by [`send`](Self::send) and [`publish`](Self::publish).
    pub fn default_options(&self) -> &DeliveryOptions {
        &self.defaults
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a consumer with no handler yet.
    ///
    /// Attach one later with [`ConsumerHandle::handler`]. Until then, sends
    /// that select this consumer resolve as "no consumer".
    pub fn consumer(&self, address: impl Into<String>) -> ConsumerHandle {
        self.register(Consumer::new(address))
    }

    /// Register a consumer together with its handler.
    pub fn consumer_with<F>(&self, address: impl Into<String>, handler: F) -> ConsumerHandle
    where
        F: Fn(Envelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let consumer = Consumer::new(address);
        consumer.set_handler(Arc::new(handler));
        self.register(consumer)
    }

    fn register(&self, consumer: Consumer) -> ConsumerHandle {
        let consumer = Arc::new(consumer);
        self.registry.register(Arc::clone(&consumer));
        self.sink
            .info(&format!("consumer registered at {}", consumer.address()));
        ConsumerHandle::new(consumer, Arc::clone(&self.registry))
    }

    /// Remove a consumer. Idempotent.
    ///
    /// Returns `true` if the consumer was still registered.
    pub fn unregister(&self, handle: &ConsumerHandle) -> bool {
        let removed = handle.unregister();
        if removed {
            self.sink
                .info(&format!("consumer unregistered from {}", handle.address()));
        }
        removed
    }

    /// Number of consumers currently registered at an address.
    pub fn consumer_count(&self, address: &str) -> usize {
        self.registry.consumer_count(address)
    }

    /// Number of requests whose reply window is still open.
    pub fn pending_replies(&self) -> usize {
        self.pending_replies.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Send
    // -----------------------------------------------------------------------

    /// Send to one consumer at `address` (fire-and-forget).
    pub fn send(&self, address: impl Into<String>, payload: serde_json::Value) {
        self.send_with(address, payload, &self.defaults);
    }

    /// Send to one consumer at `address` with explicit options.
    ///
    /// A missing consumer or a handler fault is only visible in the log sink.
    pub fn send_with(
        &self,
        address: impl Into<String>,
        payload: serde_json::Value,
        options: &DeliveryOptions,
    ) {
        let envelope = Envelope::send(address, payload).with_headers(options.headers().clone());
        let _ = self.dispatch_send(envelope);
    }

    /// Reply to an incoming envelope through its reply address.
    ///
    /// Returns `false` (and sends nothing) if the envelope was not part of a
    /// request. A reply that arrives after the requester's window closed is
    /// dropped like any send to an address with no consumer.
    pub fn reply(&self, incoming: &Envelope, payload: serde_json::Value) -> bool {
        match incoming.reply_address() {
            Some(reply_address) => {
                self.send(reply_address, payload);
                true
            }
            None => {
                debug!(envelope_id = %incoming.id(), "envelope has no reply address, reply dropped");
                false
            }
        }
    }

    /// Select one consumer now, invoke it on its own task.
    fn dispatch_send(&self, envelope: Envelope) -> JoinHandle<Dispatch> {
        let address = envelope.address().to_string();
        let selected = self.registry.select_for_send(&address);
        debug!(
            %address,
            envelope_id = %envelope.id(),
            reply_address = ?envelope.reply_address(),
            selected = selected.is_some(),
            "dispatching send"
        );

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let resolved = match selected {
                Some(consumer) => dispatch::invoke(consumer, envelope, Arc::clone(&sink)).await,
                None => Dispatch::NoConsumer,
            };
            if resolved == Dispatch::NoConsumer {
                sink.info(&format!("no consumer at {address}"));
            }
            resolved
        })
    }

    // -----------------------------------------------------------------------
    // Request-reply
    // -----------------------------------------------------------------------

    /// Send to one consumer and report the result to `on_reply`.
    ///
    /// The envelope carries a freshly generated reply address with an
    /// ephemeral consumer behind it. Dispatch is raced against
    /// `options.timeout()`:
    /// - nobody at `address`: `BusError::NoConsumer`, immediately,
    /// - the selected handler faults: `BusError::HandlerFault`, immediately,
    /// - the handler returns `Ok`: no failure from the race; a reply sent to
    ///   the reply address arrives as `Outcome::Success(reply)`,
    /// - the handler is still running at the deadline and has not replied:
    ///   `BusError::Timeout`.
    ///
    /// `on_reply` sees at most one failure and at most one success. The
    /// ephemeral consumer is removed when the timeout elapses, whichever way
    /// the request resolved; later replies are dropped.
    pub fn request<F>(
        &self,
        address: impl Into<String>,
        payload: serde_json::Value,
        options: &DeliveryOptions,
        on_reply: F,
    ) where
        F: Fn(Outcome) + Send + Sync + 'static,
    {
        let reply_address = self.reply_addresses.next();
        let slot = Arc::new(ReplySlot::new(Arc::new(on_reply)));

        let ephemeral = Arc::new(Consumer::new(reply_address.clone()));
        {
            let slot = Arc::clone(&slot);
            ephemeral.set_handler(Arc::new(move |reply: Envelope| -> anyhow::Result<()> {
                if slot.claim_success() {
                    (slot.callback())(Outcome::Success(reply));
                }
                Ok(())
            }));
        }
        self.registry.register(Arc::clone(&ephemeral));
        self.pending_replies.fetch_add(1, Ordering::SeqCst);

        let envelope = Envelope::send(address, payload)
            .with_headers(options.headers().clone())
            .with_reply_address(reply_address.clone());
        let address = envelope.address().to_string();
        let dispatched = self.dispatch_send(envelope);

        let timeout = options.timeout();
        let registry = Arc::clone(&self.registry);
        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.pending_replies);

        tokio::spawn(async move {
            let deadline = tokio::time::sleep(timeout);
            tokio::pin!(deadline);

            let resolved = tokio::select! {
                biased;
                resolved = dispatched => Some(resolved),
                _ = &mut deadline => None,
            };

            let raced = resolved.is_some();
            let failure = match resolved {
                Some(Ok(Dispatch::Delivered)) => None,
                Some(Ok(Dispatch::NoConsumer)) => Some(BusError::no_consumer(address.as_str())),
                Some(Ok(Dispatch::Faulted(fault))) => Some(BusError::from(fault)),
                Some(Err(err)) => Some(BusError::from(HandlerFault::Failed(err.to_string()))),
                None => None,
            };
            if let Some(err) = failure {
                deliver_failure(&slot, err, sink.as_ref()).await;
            }
            if raced {
                deadline.await;
            }

            // The reply window closes at the deadline however the race went.
            registry.unregister(&reply_address, ephemeral.id());
            registry.remove_if_empty(&reply_address);
            pending.fetch_sub(1, Ordering::SeqCst);
            debug!(%address, %reply_address, "reply window closed");

            if !raced && !slot.replied() {
                let timed_out = BusError::timeout(timeout);
                if deliver_failure(&slot, timed_out, sink.as_ref()).await {
                    sink.info(&format!(
                        "request to {address} timed out after {}ms",
                        timeout.as_millis()
                    ));
                }
            }
        });
    }

    /// Send a request and wait for its first outcome.
    ///
    /// A handler that returns `Ok` without replying leaves nothing to report;
    /// once the reply window closes this resolves to `BusError::Timeout`.
    pub async fn send_and_wait(
        &self,
        address: impl Into<String>,
        payload: serde_json::Value,
        options: &DeliveryOptions,
    ) -> Outcome {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        self.request(address, payload, options, move |outcome| {
            let sender = tx.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(sender) = sender {
                let _ = sender.send(outcome);
            }
        });

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(
                    timeout_ms = options.timeout().as_millis() as u64,
                    "reply window closed without a reply or failure"
                );
                Outcome::Failure(BusError::timeout(options.timeout()))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Publish
    // -----------------------------------------------------------------------

    /// Deliver to every consumer at `address`.
    pub fn publish(&self, address: impl Into<String>, payload: serde_json::Value) {
        self.publish_with(address, payload, &self.defaults);
    }

    /// Deliver to every consumer at `address` with explicit options.
    ///
    /// Each consumer runs on its own task; a fault in one is logged and does
    /// not affect the others or the publisher.
    pub fn publish_with(
        &self,
        address: impl Into<String>,
        payload: serde_json::Value,
        options: &DeliveryOptions,
    ) {
        let envelope = Envelope::publish(address, payload).with_headers(options.headers().clone());
        let consumers = self.registry.select_for_publish(envelope.address());
        debug!(
            address = %envelope.address(),
            envelope_id = %envelope.id(),
            consumers = consumers.len(),
            "publishing"
        );

        for consumer in consumers {
            tokio::spawn(dispatch::invoke(
                consumer,
                envelope.clone(),
                Arc::clone(&self.sink),
            ));
        }
    }
}

/// Hand a failure to the request's callback unless one was already sent.
///
/// Returns `true` if this call delivered it.
async fn deliver_failure(slot: &ReplySlot, err: BusError, sink: &dyn LogSink) -> bool {
    if !slot.claim_failure() {
        return false;
    }

    let callback = slot.callback();
    if let Err(fault) = dispatch::isolate(move || {
        callback(Outcome::Failure(err));
        Ok(())
    })
    .await
    {
        sink.error("reply callback faulted", &fault);
    }
    true
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("addresses", &self.registry.address_count())
            .field("pending_replies", &self.pending_replies())
            .field("default_timeout", &self.defaults.timeout())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::time::{Duration, Instant};

    /// Sink that keeps every line for assertions.
    #[derive(Default)]
    struct RecordingSink {
        infos: Mutex<Vec<String>>,
        errors: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        fn errors(&self) -> Vec<(String, String)> {
            self.errors.lock().unwrap().clone()
        }

        fn infos(&self) -> Vec<String> {
            self.infos.lock().unwrap().clone()
        }
    }

    impl LogSink for RecordingSink {
        fn info(&self, message: &str) {
            self.infos.lock().unwrap().push(message.to_string());
        }

        fn error(&self, message: &str, cause: &dyn std::error::Error) {
            self.errors
                .lock()
                .unwrap()
                .push((message.to_string(), cause.to_string()));
        }
    }

    type Inbox = Arc<Mutex<Vec<Value>>>;

    fn recording_consumer(bus: &EventBus, address: &str) -> (ConsumerHandle, Inbox) {
        let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inbox);
        let handle = bus.consumer_with(address, move |env| {
            sink.lock().unwrap().push(env.payload().clone());
            Ok(())
        });
        (handle, inbox)
    }

    fn received(inbox: &Inbox) -> Vec<Value> {
        inbox.lock().unwrap().clone()
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        let give_up = Instant::now() + Duration::from_secs(2);
        while !cond() {
            assert!(Instant::now() < give_up, "condition not reached in time");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn opts(timeout_ms: u64) -> DeliveryOptions {
        DeliveryOptions::new().with_timeout_ms(timeout_ms).unwrap()
    }

    #[tokio::test]
    async fn sends_rotate_round_robin() {
        let bus = EventBus::new();
        let (_c1, in1) = recording_consumer(&bus, "a");
        let (_c2, in2) = recording_consumer(&bus, "a");
        let (_c3, in3) = recording_consumer(&bus, "a");

        for i in 0..4 {
            bus.send("a", json!(i));
        }

        wait_until(|| received(&in1).len() + received(&in2).len() + received(&in3).len() == 4).await;
        let mut first = received(&in1);
        first.sort_by_key(|v| v.as_i64());
        assert_eq!(first, vec![json!(0), json!(3)]);
        assert_eq!(received(&in2), vec![json!(1)]);
        assert_eq!(received(&in3), vec![json!(2)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn publish_reaches_every_consumer_once() {
        let bus = EventBus::new();
        let inboxes: Vec<Inbox> = (0..4).map(|_| recording_consumer(&bus, "b").1).collect();
        let (_other, other_inbox) = recording_consumer(&bus, "unrelated");

        bus.publish("b", json!("x"));

        wait_until(|| inboxes.iter().all(|i| !received(i).is_empty())).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        for inbox in &inboxes {
            assert_eq!(received(inbox), vec![json!("x")]);
        }
        assert!(received(&other_inbox).is_empty());
    }

    #[tokio::test]
    async fn request_to_unknown_address_fails_immediately() {
        let bus = EventBus::new();
        let started = Instant::now();

        let outcome = bus.send_and_wait("unknown", json!(1), &opts(5_000)).await;

        assert!(started.elapsed() < Duration::from_secs(1));
        let err = outcome.failure().expect("failure");
        assert_eq!(err, &BusError::no_consumer("unknown"));
        assert_eq!(err.to_string(), "no consumer at unknown");
    }

    #[tokio::test]
    async fn request_times_out_and_reply_consumer_is_removed() {
        let bus = EventBus::new();
        let seen_reply_address = Arc::new(Mutex::new(None::<String>));
        let seen = Arc::clone(&seen_reply_address);
        let _stuck = bus.consumer_with("c", move |env| {
            *seen.lock().unwrap() = env.reply_address().map(str::to_string);
            std::thread::sleep(Duration::from_millis(400));
            Ok(())
        });

        let started = Instant::now();
        let outcome = bus.send_and_wait("c", json!("x"), &opts(50)).await;
        let elapsed = started.elapsed();

        let err = outcome.failure().expect("failure");
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "timeout after 50ms");
        assert!(elapsed >= Duration::from_millis(50));
        // The blocked handler must not hold the timer back.
        assert!(elapsed < Duration::from_millis(300));

        let reply_address = seen_reply_address.lock().unwrap().clone().expect("reply address");
        assert_eq!(bus.consumer_count(&reply_address), 0);
        assert_eq!(bus.pending_replies(), 0);
    }

    #[tokio::test]
    async fn handler_without_reply_emits_no_failure() {
        let bus = EventBus::new();
        let _quiet = bus.consumer_with("c", |_| Ok(()));

        let calls = Arc::new(Mutex::new(Vec::<Outcome>::new()));
        let record = Arc::clone(&calls);
        bus.request("c", json!(1), &opts(50), move |outcome| {
            record.lock().unwrap().push(outcome);
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(bus.pending_replies(), 0);
    }

    #[tokio::test]
    async fn send_and_wait_without_reply_resolves_after_window() {
        let bus = EventBus::new();
        let _quiet = bus.consumer_with("c", |_| Ok(()));

        let started = Instant::now();
        let outcome = bus.send_and_wait("c", json!(1), &opts(60)).await;

        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(outcome.failure().unwrap().is_timeout());
    }

    #[tokio::test]
    async fn reply_entries_are_dropped_after_window() {
        let bus = EventBus::new();
        let _echo = bus.consumer_with("kept", |_| Ok(()));

        for i in 0..100 {
            bus.request("nobody", json!(i), &opts(5), |_| {});
        }

        wait_until(|| bus.pending_replies() == 0).await;
        assert_eq!(bus.registry.address_count(), 1);
    }

    #[tokio::test]
    async fn request_receives_reply_before_deadline() {
        let bus = Arc::new(EventBus::new());
        let responder = Arc::clone(&bus);
        let _echo = bus.consumer_with("d", move |env| {
            responder.reply(&env, json!("y"));
            Ok(())
        });

        let started = Instant::now();
        let outcome = bus.send_and_wait("d", json!("x"), &opts(1_000)).await;

        assert!(started.elapsed() < Duration::from_millis(1_000));
        let reply = outcome.into_result().expect("reply");
        assert_eq!(reply.payload(), &json!("y"));
        assert!(reply.is_send());
    }

    #[tokio::test]
    async fn unregistered_consumer_leaves_rotation() {
        let bus = EventBus::new();
        let (c1, in1) = recording_consumer(&bus, "e");
        let (_c2, in2) = recording_consumer(&bus, "e");

        assert!(bus.unregister(&c1));
        bus.send("e", json!(1));
        bus.send("e", json!(2));

        wait_until(|| received(&in2).len() == 2).await;
        assert!(received(&in1).is_empty());
    }

    #[tokio::test]
    async fn unregister_twice_is_harmless() {
        let bus = EventBus::new();
        let (c1, _in1) = recording_consumer(&bus, "e");
        let (_c2, in2) = recording_consumer(&bus, "e");

        assert!(bus.unregister(&c1));
        assert!(!bus.unregister(&c1));
        assert!(!c1.unregister());
        assert_eq!(bus.consumer_count("e"), 1);

        bus.send("e", json!("still here"));
        wait_until(|| received(&in2).len() == 1).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn publish_isolates_faulty_consumer() {
        let sink = Arc::new(RecordingSink::default());
        let bus = EventBus::with_sink(sink.clone());
        let _faulty = bus.consumer_with("f", |_| Err(anyhow::anyhow!("disk on fire")));
        let _panicky = bus.consumer_with("f", |_| panic!("handler bug"));
        let (_healthy, inbox) = recording_consumer(&bus, "f");

        bus.publish("f", json!("x"));

        wait_until(|| received(&inbox) == vec![json!("x")]).await;
        wait_until(|| sink.errors().len() == 2).await;
        let causes: Vec<String> = sink.errors().into_iter().map(|(_, cause)| cause).collect();
        assert!(causes.contains(&"handler failed: disk on fire".to_string()));
        assert!(causes.contains(&"handler panicked: handler bug".to_string()));
    }

    #[tokio::test]
    async fn request_surfaces_handler_fault() {
        let sink = Arc::new(RecordingSink::default());
        let bus = EventBus::with_sink(sink.clone());
        let _faulty = bus.consumer_with("g", |_| Err(anyhow::anyhow!("rejected")));

        let started = Instant::now();
        let outcome = bus.send_and_wait("g", json!(1), &opts(5_000)).await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            outcome.failure(),
            Some(&BusError::HandlerFault(HandlerFault::Failed("rejected".to_string())))
        );
        assert_eq!(sink.errors().len(), 1);
    }

    #[tokio::test]
    async fn late_reply_is_dropped_and_callback_runs_once() {
        let bus = Arc::new(EventBus::new());
        let responder = Arc::clone(&bus);
        let _slow = bus.consumer_with("slow", move |env| {
            std::thread::sleep(Duration::from_millis(100));
            responder.reply(&env, json!("too late"));
            Ok(())
        });

        let calls = Arc::new(Mutex::new(Vec::<Outcome>::new()));
        let record = Arc::clone(&calls);
        bus.request("slow", json!(1), &opts(30), move |outcome| {
            record.lock().unwrap().push(outcome);
        });

        tokio::time::sleep(Duration::from_millis(250)).await;
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].failure().unwrap().is_timeout());
        assert_eq!(bus.pending_replies(), 0);
    }

    #[tokio::test]
    async fn reply_window_stays_open_until_deadline() {
        let bus = Arc::new(EventBus::new());
        let responder = Arc::clone(&bus);
        let seen_reply_address = Arc::new(Mutex::new(None::<String>));
        let seen = Arc::clone(&seen_reply_address);
        let _echo = bus.consumer_with("h", move |env| {
            *seen.lock().unwrap() = env.reply_address().map(str::to_string);
            responder.reply(&env, env.payload().clone());
            Ok(())
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let successes = Arc::new(AtomicUsize::new(0));
        let (c, s) = (Arc::clone(&calls), Arc::clone(&successes));
        let started = Instant::now();
        bus.request("h", json!(9), &opts(300), move |outcome| {
            c.fetch_add(1, Ordering::SeqCst);
            if outcome.is_success() {
                s.fetch_add(1, Ordering::SeqCst);
            }
        });

        wait_until(|| successes.load(Ordering::SeqCst) == 1).await;
        assert!(started.elapsed() < Duration::from_millis(300));
        let reply_address = seen_reply_address.lock().unwrap().clone().expect("reply address");
        assert_eq!(bus.consumer_count(&reply_address), 1);
        assert_eq!(bus.pending_replies(), 1);

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(bus.consumer_count(&reply_address), 0);
        assert_eq!(bus.pending_replies(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reply_then_fault_reports_on_both_channels() {
        let bus = Arc::new(EventBus::new());
        let responder = Arc::clone(&bus);
        let _flaky = bus.consumer_with("r", move |env| {
            responder.reply(&env, json!("partial"));
            Err(anyhow::anyhow!("failed after replying"))
        });

        let calls = Arc::new(Mutex::new(Vec::<Outcome>::new()));
        let record = Arc::clone(&calls);
        bus.request("r", json!(1), &opts(100), move |outcome| {
            record.lock().unwrap().push(outcome);
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.iter().filter(|o| o.is_success()).count(), 1);
        assert!(calls.iter().any(|o| o.failure().is_some_and(BusError::is_handler_fault)));
    }

    #[tokio::test]
    async fn consumer_wired_after_registration() {
        let bus = Arc::new(EventBus::new());
        let handle = bus.consumer("late");

        let outcome = bus.send_and_wait("late", json!(1), &opts(1_000)).await;
        assert!(outcome.failure().unwrap().is_no_consumer());

        let responder = Arc::clone(&bus);
        handle.handler(move |env| {
            responder.reply(&env, json!("wired"));
            Ok(())
        });

        let outcome = bus.send_and_wait("late", json!(2), &opts(1_000)).await;
        assert_eq!(outcome.success().unwrap().payload(), &json!("wired"));
    }

    #[tokio::test]
    async fn headers_travel_with_the_envelope() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None::<String>));
        let record = Arc::clone(&seen);
        let _h = bus.consumer_with("hdr", move |env| {
            *record.lock().unwrap() = env.header("tenant").map(str::to_string);
            Ok(())
        });

        bus.send_with("hdr", json!(null), &opts(1_000).with_header("tenant", "acme"));

        wait_until(|| seen.lock().unwrap().is_some()).await;
        assert_eq!(seen.lock().unwrap().as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn plain_send_to_nobody_is_only_logged() {
        let sink = Arc::new(RecordingSink::default());
        let bus = EventBus::with_sink(sink.clone());

        bus.send("nobody", json!(1));

        wait_until(|| sink.infos().iter().any(|l| l == "no consumer at nobody")).await;
        assert!(sink.errors().is_empty());
    }

    #[test]
    fn reply_without_reply_address_sends_nothing() {
        let bus = EventBus::new();
        let plain = Envelope::send("x", json!(1));
        assert!(!bus.reply(&plain, json!(2)));
    }

    #[test]
    fn with_config_rejects_zero_timeout() {
        let config = BusConfig {
            default_timeout_ms: 0,
        };
        let result = EventBus::with_config(&config, Arc::new(TracingSink));
        assert!(matches!(result, Err(OptionsError::ZeroTimeout)));

        let bus = EventBus::with_config(&BusConfig::default(), Arc::new(TracingSink)).unwrap();
        assert_eq!(bus.default_options().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn debug_impl() {
        let bus = EventBus::new();
        let debug = format!("{bus:?}");
        assert!(debug.contains("EventBus"));
        assert!(debug.contains("pending_replies"));
    }
}
