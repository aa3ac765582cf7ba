//! ConnectionWorker — owns the IMS WebSocket and its lifecycle
//!
//! 1. Connect WebSocket to the IMS endpoint
//! 2. Publish readiness through a state watch so parked callers proceed
//! 3. Forward outbound requests onto the socket, acking send results
//! 4. Dispatch inbound frames: correlated replies first, then broadcasts
//! 5. On close/error: drain the correlation table, wait the fixed
//!    reconnect interval, retry — unless the caller disconnected

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use shared::{ImsMessage, InventoryEvent};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, connect_async};
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::correlation::CorrelationTable;
use crate::error::BridgeError;
use crate::observers::ObserverRegistry;

pub type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection lifecycle. A drop always returns fully to `Disconnected`
/// before the supervisor retries; there is no Connected→Connecting path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// One outbound request handed from the facade to the worker. The ack
/// carries the transport send result so the facade can distinguish
/// `SendFailed` from a later timeout.
pub struct SendRequest {
    pub msg: ImsMessage,
    pub ack: oneshot::Sender<Result<(), String>>,
}

/// How a session came to an end.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Transport dropped or shutdown fired; the supervisor decides what next.
    Dropped,
    /// The facade side of the outbound channel is gone. Terminal: there is
    /// nobody left to serve, so the worker must not keep reconnecting.
    FacadeGone,
}

pub struct ConnectionWorker {
    config: BridgeConfig,
    table: Arc<CorrelationTable>,
    observers: Arc<ObserverRegistry>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    outbound: mpsc::Receiver<SendRequest>,
    shutdown: CancellationToken,
}

impl ConnectionWorker {
    pub fn new(
        config: BridgeConfig,
        table: Arc<CorrelationTable>,
        observers: Arc<ObserverRegistry>,
        state_tx: Arc<watch::Sender<ConnectionState>>,
        outbound: mpsc::Receiver<SendRequest>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            table,
            observers,
            state_tx,
            outbound,
            shutdown,
        }
    }

    /// Main run loop — connect, handle one session, reconnect on failure.
    pub async fn run(mut self) {
        let url = self.config.ws_url();
        tracing::info!(%url, "IMS bridge worker started");

        'supervise: loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let mut facade_gone = false;
            self.set_state(ConnectionState::Connecting);
            match connect_async(&url).await {
                Ok((ws, _response)) => {
                    tracing::info!(%url, "connected to IMS");
                    self.set_state(ConnectionState::Connected);
                    if self.run_session(ws).await == SessionEnd::FacadeGone {
                        tracing::info!("bridge facade dropped, stopping worker");
                        facade_gone = true;
                    }
                }
                Err(e) => {
                    tracing::warn!(%url, "IMS connection failed: {e}");
                }
            }

            // Every request in flight at the moment of the drop fails now
            // with a connection-closed error rather than waiting out its
            // timer. A cancelled worker leaves the state watch to its
            // successor.
            if !self.shutdown.is_cancelled() {
                self.set_state(ConnectionState::Disconnected);
            }
            let drained = self.table.drain_all(BridgeError::ConnectionClosed);
            if drained > 0 {
                tracing::warn!(count = drained, "drained in-flight requests after disconnect");
            }
            if facade_gone {
                break;
            }

            // Wait out the reconnect interval. Requests queued behind the
            // dead session are failed here so their acks never outwait the
            // outage.
            let reconnect = tokio::time::sleep(self.config.reconnect_interval);
            tokio::pin!(reconnect);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break 'supervise,
                    _ = &mut reconnect => continue 'supervise,
                    cmd = self.outbound.recv() => match cmd {
                        Some(SendRequest { ack, .. }) => {
                            let _ = ack.send(Err("not connected".into()));
                        }
                        None => break 'supervise,
                    }
                }
            }
        }

        if self.shutdown.is_cancelled() {
            // A fresh worker may already be publishing its own transitions;
            // only collapse a leftover Closing.
            self.state_tx.send_if_modified(|current| {
                if *current == ConnectionState::Closing {
                    *current = ConnectionState::Disconnected;
                    true
                } else {
                    false
                }
            });
        } else {
            self.set_state(ConnectionState::Disconnected);
        }
        self.table.drain_all(BridgeError::ConnectionClosed);
        tracing::info!("IMS bridge worker stopped");
    }

    /// Run a single session until disconnect or shutdown.
    async fn run_session(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = sink.close().await;
                    return SessionEnd::Dropped;
                }

                cmd = self.outbound.recv() => {
                    let Some(SendRequest { msg, ack }) = cmd else {
                        let _ = sink.close().await;
                        return SessionEnd::FacadeGone;
                    };
                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            let _ = ack.send(Err(format!("serialize request: {e}")));
                            continue;
                        }
                    };
                    match sink.send(Message::Text(json.into())).await {
                        Ok(()) => {
                            let _ = ack.send(Ok(()));
                        }
                        Err(e) => {
                            tracing::warn!("IMS send failed, disconnecting: {e}");
                            let _ = ack.send(Err(e.to_string()));
                            return SessionEnd::Dropped;
                        }
                    }
                }

                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.dispatch(&text),
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("IMS closed the connection");
                            return SessionEnd::Dropped;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("IMS websocket error: {e}");
                            return SessionEnd::Dropped;
                        }
                        None => {
                            tracing::info!("IMS websocket stream ended");
                            return SessionEnd::Dropped;
                        }
                        _ => {} // Binary, Pong — ignore
                    }
                }
            }
        }
    }

    /// Route one inbound frame.
    ///
    /// Correlated replies are checked first so a direct reply to this
    /// bridge's own request is never re-broadcast as an unrelated event.
    fn dispatch(&self, text: &str) {
        let msg: ImsMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("undecodable IMS frame dropped: {e}");
                return;
            }
        };

        if let Some(key) = msg.correlation_key() {
            if self.table.resolve(key, msg.clone()) {
                tracing::debug!(%key, "reply delivered to waiter");
                return;
            }
        }

        match msg {
            ImsMessage::StockChanged {
                item_id,
                current_quantity,
                delta,
            } => {
                let event = InventoryEvent::new(item_id, current_quantity, delta);
                let delivered = self.observers.broadcast(&event);
                tracing::debug!(item_id, delta, delivered, "stock change broadcast");
            }
            ImsMessage::Error { message, item_id } => match item_id {
                Some(item_id) => {
                    let failed = self
                        .table
                        .fail_item(item_id, BridgeError::Rejected(message.clone()));
                    if failed == 0 {
                        tracing::warn!(item_id, "IMS error with no matching request: {message}");
                    }
                }
                None => tracing::warn!("IMS error: {message}"),
            },
            ImsMessage::StockInfo { item_id, .. } | ImsMessage::StockUpdated { item_id, .. } => {
                // Late or duplicate reply; the waiter is long gone.
                tracing::debug!(item_id, "unmatched reply dropped");
            }
            ImsMessage::StockQuery { .. } | ImsMessage::StockUpdate { .. } => {
                tracing::warn!("request-type frame from IMS dropped");
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        // Closing is caller-driven; the worker never overrides it except by
        // its final Disconnected on exit.
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            if *current == ConnectionState::Closing && state != ConnectionState::Disconnected {
                return false;
            }
            *current = state;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::ObserverRegistry;
    use std::time::Duration;

    /// A request parked in the outbound queue while the IMS is unreachable
    /// must get its ack failed promptly, not sit until a future session
    /// pops it.
    #[tokio::test]
    async fn queued_send_is_failed_while_disconnected() {
        let config = BridgeConfig::default()
            .with_host("127.0.0.1")
            .with_port(1) // nothing listens here
            .with_reconnect_interval(Duration::from_millis(50));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        let worker = ConnectionWorker::new(
            config,
            Arc::new(CorrelationTable::new()),
            Arc::new(ObserverRegistry::new()),
            Arc::new(state_tx),
            outbound_rx,
            shutdown.clone(),
        );
        let join = tokio::spawn(worker.run());

        let (ack_tx, ack_rx) = oneshot::channel();
        outbound_tx
            .send(SendRequest {
                msg: ImsMessage::StockQuery {
                    item_id: 1,
                    auth_token: "t".into(),
                },
                ack: ack_tx,
            })
            .await
            .unwrap();

        let ack = tokio::time::timeout(Duration::from_secs(1), ack_rx)
            .await
            .expect("ack must not wait out the outage")
            .unwrap();
        assert!(ack.is_err());

        shutdown.cancel();
        join.await.unwrap();
    }

    /// A worker whose facade is gone stops instead of reconnecting on every
    /// interval forever.
    #[tokio::test]
    async fn worker_stops_when_outbound_channel_closes() {
        let config = BridgeConfig::default()
            .with_host("127.0.0.1")
            .with_port(1)
            .with_reconnect_interval(Duration::from_millis(50));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::channel::<SendRequest>(4);
        let worker = ConnectionWorker::new(
            config,
            Arc::new(CorrelationTable::new()),
            Arc::new(ObserverRegistry::new()),
            Arc::new(state_tx),
            outbound_rx,
            CancellationToken::new(),
        );
        let join = tokio::spawn(worker.run());

        drop(outbound_tx);
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("worker must exit once the facade is gone")
            .unwrap();
    }
}
