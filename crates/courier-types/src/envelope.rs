//! The in-flight message envelope.
//!
//! An `Envelope` describes one message travelling through the bus: the target
//! address, a flexible JSON payload, whether it was sent point-to-point or
//! published, and (for requests) the generated address replies should go to.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message delivered to consumers.
///
/// Envelopes are values: once built they are never mutated, and each consumer
/// receives its own clone. The reply address is only present when the sender
/// supplied a reply callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// UUIDv7 message ID.
    id: Uuid,
    /// Destination address.
    address: String,
    /// Flexible JSON payload.
    payload: serde_json::Value,
    /// Where replies to this message should be sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reply_address: Option<String>,
    /// `true` for point-to-point sends, `false` for publishes.
    is_send: bool,
    /// Headers copied from the delivery options.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    /// When the envelope was created.
    sent_at: DateTime<Utc>,
}

impl Envelope {
    /// Build an envelope for a point-to-point send.
    pub fn send(address: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(address.into(), payload, true)
    }

    /// Build an envelope for a broadcast publish.
    pub fn publish(address: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(address.into(), payload, false)
    }

    fn new(address: String, payload: serde_json::Value, is_send: bool) -> Self {
        Self {
            id: Uuid::now_v7(),
            address,
            payload,
            reply_address: None,
            is_send,
            headers: BTreeMap::new(),
            sent_at: Utc::now(),
        }
    }

    /// Attach the address replies should be delivered to.
    pub fn with_reply_address(mut self, reply_address: impl Into<String>) -> Self {
        self.reply_address = Some(reply_address.into());
        self
    }

    /// Attach delivery headers.
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Consume the envelope, keeping only the payload.
    pub fn into_payload(self) -> serde_json::Value {
        self.payload
    }

    pub fn reply_address(&self) -> Option<&str> {
        self.reply_address.as_deref()
    }

    pub fn is_send(&self) -> bool {
        self.is_send
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
