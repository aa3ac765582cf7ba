//! InventoryBridge — the public contract of the synchronization bridge.
//!
//! One bridge instance owns the transport connection, correlation table and
//! observer registry for its process lifetime. Callers hold the facade
//! only; construct it explicitly and pass it to whatever layer needs it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::{CorrelationKey, ImsMessage, InventoryEvent, ReplyKind};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogClient;
use crate::config::BridgeConfig;
use crate::correlation::CorrelationTable;
use crate::error::{BridgeError, BridgeResult};
use crate::observers::{ObserverId, ObserverRegistry};
use crate::worker::{ConnectionState, ConnectionWorker, SendRequest};

const OUTBOUND_QUEUE: usize = 64;

struct WorkerHandle {
    outbound: mpsc::Sender<SendRequest>,
    shutdown: CancellationToken,
    join: JoinHandle<()>,
}

/// Bridge to the external inventory-management service.
pub struct InventoryBridge {
    config: BridgeConfig,
    table: Arc<CorrelationTable>,
    observers: Arc<ObserverRegistry>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    catalog: CatalogClient,
    worker: Mutex<Option<WorkerHandle>>,
}

impl InventoryBridge {
    pub fn new(config: BridgeConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let catalog = CatalogClient::new(&config);
        Self {
            config,
            table: Arc::new(CorrelationTable::new()),
            observers: Arc::new(ObserverRegistry::new()),
            state_tx: Arc::new(state_tx),
            catalog,
            worker: Mutex::new(None),
        }
    }

    /// Start the connection supervisor. Idempotent: calling while the
    /// worker is alive (Connected, Connecting, or waiting out a reconnect)
    /// is a no-op.
    pub fn connect(&self) {
        let mut guard = self.worker.lock().expect("bridge worker lock poisoned");
        if let Some(handle) = guard.as_ref() {
            if !handle.join.is_finished() {
                tracing::debug!("bridge already connecting/connected");
                return;
            }
        }

        // The previous worker may not have collapsed a leftover Closing yet;
        // the fresh worker starts from Disconnected either way.
        self.state_tx.send_if_modified(|current| {
            if *current == ConnectionState::Closing {
                *current = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let shutdown = CancellationToken::new();
        let worker = ConnectionWorker::new(
            self.config.clone(),
            self.table.clone(),
            self.observers.clone(),
            self.state_tx.clone(),
            outbound_rx,
            shutdown.clone(),
        );
        let join = tokio::spawn(worker.run());
        *guard = Some(WorkerHandle {
            outbound: outbound_tx,
            shutdown,
            join,
        });
    }

    /// Caller-initiated shutdown: closes the transport and suppresses the
    /// auto-reconnect. The bridge must not self-heal after this.
    pub fn disconnect(&self) {
        let handle = {
            let mut guard = self.worker.lock().expect("bridge worker lock poisoned");
            guard.take()
        };
        if let Some(handle) = handle {
            self.state_tx.send_replace(ConnectionState::Closing);
            handle.shutdown.cancel();
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Wait until the bridge reports `Connected`, bounded by `timeout`.
    pub async fn wait_connected(&self, timeout: Duration) -> BridgeResult<()> {
        let mut rx = self.state_tx.subscribe();
        tokio::time::timeout(timeout, async move {
            loop {
                if *rx.borrow_and_update() == ConnectionState::Connected {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await
        .map_err(|_| BridgeError::Timeout)
    }

    /// Query the current quantity of one item.
    pub async fn query_stock(&self, item_id: i64) -> BridgeResult<i64> {
        self.query_stock_with_cancel(item_id, &CancellationToken::new())
            .await
    }

    /// `query_stock` with an explicit cancellation token. Firing the token
    /// fails the caller locally; a late reply is treated as a no-op.
    pub async fn query_stock_with_cancel(
        &self,
        item_id: i64,
        cancel: &CancellationToken,
    ) -> BridgeResult<i64> {
        let key = CorrelationKey::new(ReplyKind::StockInfo, item_id);
        let msg = ImsMessage::StockQuery {
            item_id,
            auth_token: self.config.auth_token.clone(),
        };
        match self.request(key, msg, cancel).await? {
            ImsMessage::StockInfo {
                current_quantity, ..
            } => Ok(current_quantity),
            other => Err(BridgeError::Protocol(format!(
                "expected stock_info, got {other:?}"
            ))),
        }
    }

    /// Apply a signed quantity delta (negative = consumption, positive =
    /// restock) and return the new quantity once the IMS acknowledges.
    ///
    /// The bridge does not dedupe retries: a caller that needs
    /// at-least-once application must be prepared to retry on `Timeout`,
    /// and an exactly-once consumer needs its own reconciliation.
    pub async fn update_stock(&self, item_id: i64, delta: i64) -> BridgeResult<i64> {
        self.update_stock_with_cancel(item_id, delta, &CancellationToken::new())
            .await
    }

    /// `update_stock` with an explicit cancellation token.
    pub async fn update_stock_with_cancel(
        &self,
        item_id: i64,
        delta: i64,
        cancel: &CancellationToken,
    ) -> BridgeResult<i64> {
        let key = CorrelationKey::new(ReplyKind::StockUpdated, item_id);
        let msg = ImsMessage::StockUpdate {
            item_id,
            quantity_delta: delta,
            auth_token: self.config.auth_token.clone(),
        };
        match self.request(key, msg, cancel).await? {
            ImsMessage::StockUpdated { new_quantity, .. } => Ok(new_quantity),
            other => Err(BridgeError::Protocol(format!(
                "expected stock_updated, got {other:?}"
            ))),
        }
    }

    /// Register an observer for inventory-change broadcasts.
    pub fn add_observer(&self, tx: mpsc::Sender<InventoryEvent>) -> ObserverId {
        self.observers.add(tx)
    }

    /// Register an observer and get the receiving half of its channel.
    pub fn subscribe_events(&self, capacity: usize) -> (ObserverId, mpsc::Receiver<InventoryEvent>) {
        self.observers.subscribe(capacity)
    }

    /// Remove an observer. Safe in any connection state.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Number of requests currently awaiting a reply
    pub fn pending_requests(&self) -> usize {
        self.table.len()
    }

    /// The stateless bulk-sync client (independent of the persistent
    /// connection).
    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    /// Send a correlated request and await its reply.
    async fn request(
        &self,
        key: CorrelationKey,
        msg: ImsMessage,
        cancel: &CancellationToken,
    ) -> BridgeResult<ImsMessage> {
        // Fail fast without sending anything when the link is down.
        if self.state() != ConnectionState::Connected {
            return Err(BridgeError::NotConnected);
        }

        let outbound = {
            let guard = self.worker.lock().expect("bridge worker lock poisoned");
            match guard.as_ref() {
                Some(handle) => handle.outbound.clone(),
                None => return Err(BridgeError::NotConnected),
            }
        };

        let waiter = self.table.register(key)?;

        let (ack_tx, ack_rx) = oneshot::channel();
        if outbound
            .send(SendRequest { msg, ack: ack_tx })
            .await
            .is_err()
        {
            self.table.remove_if(key, waiter.id);
            return Err(BridgeError::NotConnected);
        }
        // The ack wait is bounded too: a request that lands in the queue
        // just as a session dies must not outwait the outage.
        match tokio::time::timeout(self.config.request_timeout, ack_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                // Entry removed immediately; no point waiting out the timer.
                self.table.remove_if(key, waiter.id);
                return Err(BridgeError::SendFailed(e));
            }
            Ok(Err(_)) => {
                self.table.remove_if(key, waiter.id);
                return Err(BridgeError::SendFailed("worker dropped request".into()));
            }
            Err(_elapsed) => {
                self.table.remove_if(key, waiter.id);
                return Err(BridgeError::Timeout);
            }
        }

        let rx = waiter.rx;
        tokio::select! {
            _ = cancel.cancelled() => {
                // The entry stays registered on purpose: a late reply for a
                // cancelled call resolves into this dropped receiver.
                Err(BridgeError::Cancelled)
            }
            result = tokio::time::timeout(self.config.request_timeout, rx) => {
                match result {
                    Ok(Ok(reply)) => reply,
                    Ok(Err(_)) => Err(BridgeError::ConnectionClosed),
                    Err(_elapsed) => {
                        self.table.remove_if(key, waiter.id);
                        Err(BridgeError::Timeout)
                    }
                }
            }
        }
    }
}

impl Drop for InventoryBridge {
    fn drop(&mut self) {
        // The worker also stops on its own when the outbound channel
        // closes; cancelling here spares it the rest of a reconnect wait.
        if let Ok(guard) = self.worker.get_mut() {
            if let Some(handle) = guard.take() {
                handle.shutdown.cancel();
            }
        }
    }
}
