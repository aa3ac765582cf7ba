//! Correlation table: pairs outstanding requests with their eventual reply.
//!
//! Each entry is owned exclusively by the table and delivered exactly once,
//! either by a matching reply (`resolve`), an explicit failure (`fail`), or
//! the supervisor-driven drain on disconnect. Duplicate and late replies are
//! silent no-ops.
//!
//! Conflict policy: a second request for a key that is still in flight is
//! rejected with [`BridgeError::Conflict`]. Overwriting would silently lose
//! the first caller's waiter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use shared::{CorrelationKey, ImsMessage, ReplyKind};
use tokio::sync::oneshot;

use crate::error::BridgeError;

struct Pending {
    /// Identity of this entry. Cleanup paths (timeout, cancel) only remove
    /// the entry they created, never a successor registered after a drain.
    id: u64,
    tx: oneshot::Sender<Result<ImsMessage, BridgeError>>,
}

/// Receiving half handed to the caller parked on a request.
#[derive(Debug)]
pub struct Waiter {
    pub key: CorrelationKey,
    pub id: u64,
    pub rx: oneshot::Receiver<Result<ImsMessage, BridgeError>>,
}

/// The set of outstanding requests, keyed by expected reply.
#[derive(Default)]
pub struct CorrelationTable {
    entries: Mutex<HashMap<CorrelationKey, Pending>>,
    next_id: AtomicU64,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `key`. Fails with `Conflict` if a request for
    /// the same key is already in flight.
    pub fn register(&self, key: CorrelationKey) -> Result<Waiter, BridgeError> {
        let mut entries = self.entries.lock().expect("correlation table poisoned");
        if entries.contains_key(&key) {
            return Err(BridgeError::Conflict(key));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        entries.insert(key, Pending { id, tx });
        Ok(Waiter { key, id, rx })
    }

    /// Deliver a reply to the waiter for `key`. Returns `false` when no
    /// entry matched; late or duplicate replies must not crash the bridge.
    pub fn resolve(&self, key: CorrelationKey, msg: ImsMessage) -> bool {
        self.complete(key, Ok(msg))
    }

    /// Fail the waiter for `key`. A miss is a silent no-op.
    pub fn fail(&self, key: CorrelationKey, err: BridgeError) -> bool {
        self.complete(key, Err(err))
    }

    /// Fail whichever pending request (query or update) is waiting on
    /// `item_id`. Used for explicit IMS error replies that carry an item id
    /// but not a reply type. Returns the number of entries failed.
    pub fn fail_item(&self, item_id: i64, err: BridgeError) -> usize {
        let mut failed = 0;
        for reply in [ReplyKind::StockInfo, ReplyKind::StockUpdated] {
            if self.fail(CorrelationKey::new(reply, item_id), err.clone()) {
                failed += 1;
            }
        }
        failed
    }

    /// Remove the entry for `key` only if it is still the one identified by
    /// `id`. Guards timeout and cancellation cleanup against evicting a
    /// successor entry.
    pub fn remove_if(&self, key: CorrelationKey, id: u64) -> bool {
        let mut entries = self.entries.lock().expect("correlation table poisoned");
        match entries.get(&key) {
            Some(pending) if pending.id == id => {
                entries.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Fail every outstanding entry with the same error and clear the
    /// table. Atomic with respect to concurrent `register` calls: a
    /// register serializes on the table lock and lands either before the
    /// drain (and is failed by it) or after (and belongs to the next
    /// session). Returns the number of entries drained.
    pub fn drain_all(&self, err: BridgeError) -> usize {
        let drained: Vec<(CorrelationKey, Pending)> = {
            let mut entries = self.entries.lock().expect("correlation table poisoned");
            entries.drain().collect()
        };
        let count = drained.len();
        for (key, pending) in drained {
            tracing::debug!(%key, "draining pending request");
            let _ = pending.tx.send(Err(err.clone()));
        }
        count
    }

    /// Number of outstanding requests
    pub fn len(&self) -> usize {
        self.entries.lock().expect("correlation table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn complete(&self, key: CorrelationKey, result: Result<ImsMessage, BridgeError>) -> bool {
        let pending = {
            let mut entries = self.entries.lock().expect("correlation table poisoned");
            entries.remove(&key)
        };
        match pending {
            Some(p) => {
                // The receiver may be gone (cancelled caller): still a no-op.
                let _ = p.tx.send(result);
                true
            }
            None => false,
        }
    }
}
