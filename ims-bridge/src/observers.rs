//! Observer registry: fan-out of inventory events to POS terminals.
//!
//! Membership is caller-driven and independent of the IMS connection state.
//! Broadcast iterates a snapshot of the registry so concurrent add/remove
//! never races the pass; a dead observer is removed after the pass
//! completes, never during.

use dashmap::DashMap;
use shared::InventoryEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Opaque handle identifying one registered observer.
pub type ObserverId = Uuid;

/// The set of locally connected observers.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    observers: DashMap<ObserverId, mpsc::Sender<InventoryEvent>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer by its event channel.
    pub fn add(&self, tx: mpsc::Sender<InventoryEvent>) -> ObserverId {
        let id = Uuid::new_v4();
        self.observers.insert(id, tx);
        tracing::info!(observer = %id, total = self.observers.len(), "observer registered");
        id
    }

    /// Create a bounded channel and register its sending half.
    pub fn subscribe(&self, capacity: usize) -> (ObserverId, mpsc::Receiver<InventoryEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (self.add(tx), rx)
    }

    /// Remove an observer. Unknown ids are a no-op.
    pub fn remove(&self, id: ObserverId) -> bool {
        let removed = self.observers.remove(&id).is_some();
        if removed {
            tracing::info!(observer = %id, total = self.observers.len(), "observer removed");
        }
        removed
    }

    /// Broadcast an event to every live observer. Returns the number of
    /// deliveries. Observers whose channel is closed or full are dropped
    /// from the registry once the pass is over; the event is not retried.
    pub fn broadcast(&self, event: &InventoryEvent) -> usize {
        let snapshot: Vec<(ObserverId, mpsc::Sender<InventoryEvent>)> = self
            .observers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Closed(_)) => dead.push(id),
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(observer = %id, "observer not draining its channel, dropping it");
                    dead.push(id);
                }
            }
        }

        for id in dead {
            self.observers.remove(&id);
            tracing::info!(observer = %id, "dead observer dropped after broadcast");
        }
        delivered
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
