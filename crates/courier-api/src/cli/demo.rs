//! Demo commands exercising each delivery mode on a live bus.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use console::style;
use serde_json::json;
use tokio::sync::mpsc;

use courier_core::{ConsumerHandle, EventBus};
use courier_types::{DeliveryOptions, Outcome};

const PING_ADDRESS: &str = "demo.ping";
const FANOUT_ADDRESS: &str = "demo.fanout";
const ROUND_ROBIN_ADDRESS: &str = "demo.round-robin";

/// How long the fanout and round-robin demos wait for deliveries.
const COLLECT_WINDOW: Duration = Duration::from_secs(5);

/// Request-reply against a responder that answers after `delay`.
pub async fn ping(
    bus: Arc<EventBus>,
    delay: Duration,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let options = match timeout_ms {
        Some(ms) => DeliveryOptions::new().with_timeout_ms(ms)?,
        None => bus.default_options().clone(),
    };

    let weak = Arc::downgrade(&bus);
    let responder = bus.consumer_with(PING_ADDRESS, move |envelope| {
        let bus = weak.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(bus) = bus.upgrade() {
                bus.reply(&envelope, json!({ "pong": envelope.payload() }));
            }
        });
        Ok(())
    });

    tracing::debug!(
        delay_ms = delay.as_millis() as u64,
        timeout_ms = options.timeout().as_millis() as u64,
        "pinging"
    );
    let started = Instant::now();
    let outcome = bus
        .send_and_wait(PING_ADDRESS, json!({ "seq": 1 }), &options)
        .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    responder.unregister();

    if json {
        let report = match &outcome {
            Outcome::Success(reply) => json!({
                "outcome": "success",
                "reply": reply.payload(),
                "latency_ms": elapsed_ms,
            }),
            Outcome::Failure(err) => json!({
                "outcome": "failure",
                "error": err.to_string(),
                "latency_ms": elapsed_ms,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    match &outcome {
        Outcome::Success(reply) => println!(
            "  {} Reply {} in {}",
            style("✓").green(),
            style(reply.payload()).cyan(),
            style(format!("{elapsed_ms}ms")).bold()
        ),
        Outcome::Failure(err) => println!(
            "  {} {} after {}",
            style("✗").red(),
            style(err).red(),
            style(format!("{elapsed_ms}ms")).bold()
        ),
    }
    println!();
    Ok(())
}

/// Publish once to `consumers` consumers and count how many received it.
pub async fn fanout(bus: Arc<EventBus>, consumers: usize, json: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handles: Vec<ConsumerHandle> = (0..consumers)
        .map(|index| {
            let tx = tx.clone();
            bus.consumer_with(FANOUT_ADDRESS, move |_envelope| {
                let _ = tx.send(index);
                Ok(())
            })
        })
        .collect();
    drop(tx);

    bus.publish(FANOUT_ADDRESS, json!({ "event": "fanout" }));
    let delivered = collect(&mut rx, consumers).await.len();
    unregister_all(&handles);

    if json {
        let report = json!({
            "consumers": consumers,
            "delivered": delivered,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    let mark = if delivered == consumers {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!(
        "  {} Published to {}: delivered to {} of {} consumers",
        mark,
        style(FANOUT_ADDRESS).cyan(),
        style(delivered).bold(),
        consumers
    );
    println!();
    Ok(())
}

/// Send `sends` messages to `consumers` consumers and tally the rotation.
pub async fn round_robin(
    bus: Arc<EventBus>,
    consumers: usize,
    sends: usize,
    json: bool,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handles: Vec<ConsumerHandle> = (0..consumers)
        .map(|index| {
            let tx = tx.clone();
            bus.consumer_with(ROUND_ROBIN_ADDRESS, move |_envelope| {
                let _ = tx.send(index);
                Ok(())
            })
        })
        .collect();
    drop(tx);

    for seq in 0..sends {
        bus.send(ROUND_ROBIN_ADDRESS, json!({ "seq": seq }));
    }
    let received = collect(&mut rx, if consumers == 0 { 0 } else { sends }).await;
    unregister_all(&handles);

    let counts = tally(&received, consumers);

    if json {
        let report = json!({
            "consumers": consumers,
            "sends": sends,
            "distribution": counts,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("── Distribution ──").dim());
    for (index, count) in counts.iter().enumerate() {
        println!("  consumer {:<3} {}", index + 1, style(count).bold());
    }
    println!();
    Ok(())
}

/// Receive up to `expected` deliveries, giving up after the collect window.
async fn collect(rx: &mut mpsc::UnboundedReceiver<usize>, expected: usize) -> Vec<usize> {
    let mut received = Vec::with_capacity(expected);
    let deadline = tokio::time::sleep(COLLECT_WINDOW);
    tokio::pin!(deadline);

    while received.len() < expected {
        tokio::select! {
            next = rx.recv() => match next {
                Some(index) => received.push(index),
                None => break,
            },
            _ = &mut deadline => break,
        }
    }
    received
}

fn tally(received: &[usize], consumers: usize) -> Vec<usize> {
    let mut counts = vec![0; consumers];
    for &index in received {
        if let Some(count) = counts.get_mut(index) {
            *count += 1;
        }
    }
    counts
}

fn unregister_all(handles: &[ConsumerHandle]) {
    for handle in handles {
        handle.unregister();
    }
}
