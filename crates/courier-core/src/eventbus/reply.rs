//! Reply correlation primitives: the per-request reply slot and the reply
//! address generator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use courier_types::Outcome;

/// Prefix for generated reply addresses.
pub const REPLY_ADDRESS_PREFIX: &str = "__courier.reply.";

/// Callback invoked with the resolution of a request.
///
/// It sees at most one `Failure` (from the dispatch race) and at most one
/// `Success` (the first reply). In practice a request resolves once; both
/// only arrive when a handler replies and then faults.
pub type ReplyCallback = Arc<dyn Fn(Outcome) + Send + Sync>;

/// A request's callback plus the two once-only guards in front of it.
pub(crate) struct ReplySlot {
    callback: ReplyCallback,
    success_claimed: AtomicBool,
    failure_claimed: AtomicBool,
}

impl ReplySlot {
    pub(crate) fn new(callback: ReplyCallback) -> Self {
        Self {
            callback,
            success_claimed: AtomicBool::new(false),
            failure_claimed: AtomicBool::new(false),
        }
    }

    pub(crate) fn callback(&self) -> ReplyCallback {
        Arc::clone(&self.callback)
    }

    /// Claim the success channel. Only the first caller gets `true`.
    pub(crate) fn claim_success(&self) -> bool {
        !self.success_claimed.swap(true, Ordering::SeqCst)
    }

    /// Claim the failure channel. Only the first caller gets `true`.
    pub(crate) fn claim_failure(&self) -> bool {
        !self.failure_claimed.swap(true, Ordering::SeqCst)
    }

    /// Whether a reply has already been delivered.
    pub(crate) fn replied(&self) -> bool {
        self.success_claimed.load(Ordering::SeqCst)
    }
}

/// Mints reply addresses unique within one bus.
#[derive(Debug, Default)]
pub(crate) struct ReplyAddresses {
    next: AtomicU64,
}

impl ReplyAddresses {
    pub(crate) fn next(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{REPLY_ADDRESS_PREFIX}{n}")
    }
}
