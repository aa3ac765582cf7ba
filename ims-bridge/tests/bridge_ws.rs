//! Integration tests driving the bridge against an in-process mock IMS
//! WebSocket server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use ims_bridge::{BridgeConfig, BridgeError, ConnectionState, InventoryBridge};
use shared::ImsMessage;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct MockState {
    stock: Mutex<HashMap<i64, i64>>,
    /// Never reply to correlated requests
    swallow_requests: AtomicBool,
    /// Close the connection upon receiving the next request
    drop_on_next_request: AtomicBool,
    /// Channels for pushing unsolicited frames into live sessions
    sessions: Mutex<Vec<mpsc::UnboundedSender<ImsMessage>>>,
    connections: AtomicUsize,
}

struct MockIms {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockIms {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockState::default());

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(stream).await else {
                        return;
                    };
                    state.connections.fetch_add(1, Ordering::SeqCst);
                    run_session(state, ws).await;
                });
            }
        });

        Self { addr, state }
    }

    fn config(&self) -> BridgeConfig {
        BridgeConfig::default()
            .with_host("127.0.0.1")
            .with_port(self.addr.port())
            .with_reconnect_interval(Duration::from_millis(100))
            .with_request_timeout(Duration::from_secs(1))
    }

    fn set_stock(&self, item_id: i64, qty: i64) {
        self.state.stock.lock().unwrap().insert(item_id, qty);
    }

    fn push(&self, msg: ImsMessage) {
        let sessions = self.state.sessions.lock().unwrap();
        for tx in sessions.iter() {
            let _ = tx.send(msg.clone());
        }
    }

    fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }
}

async fn run_session(
    state: Arc<MockState>,
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
) {
    let (mut sink, mut stream) = ws.split();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel();
    state.sessions.lock().unwrap().push(push_tx);

    loop {
        tokio::select! {
            pushed = push_rx.recv() => {
                let Some(msg) = pushed else { return; };
                let json = serde_json::to_string(&msg).unwrap();
                if sink.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(_)) => return,
                    _ => continue,
                };
                let msg: ImsMessage = serde_json::from_str(&text).unwrap();
                if state.drop_on_next_request.swap(false, Ordering::SeqCst) {
                    return;
                }
                if state.swallow_requests.load(Ordering::SeqCst) {
                    continue;
                }
                let reply = match msg {
                    ImsMessage::StockQuery { item_id, .. } => {
                        let qty = state.stock.lock().unwrap().get(&item_id).copied().unwrap_or(0);
                        ImsMessage::StockInfo { item_id, current_quantity: qty }
                    }
                    ImsMessage::StockUpdate { item_id, quantity_delta, .. } => {
                        let mut stock = state.stock.lock().unwrap();
                        let qty = stock.entry(item_id).or_insert(0);
                        *qty += quantity_delta;
                        ImsMessage::StockUpdated { item_id, new_quantity: *qty }
                    }
                    _ => continue,
                };
                let json = serde_json::to_string(&reply).unwrap();
                if sink.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn connected_bridge(ims: &MockIms) -> InventoryBridge {
    let bridge = InventoryBridge::new(ims.config());
    bridge.connect();
    bridge
        .wait_connected(Duration::from_secs(2))
        .await
        .expect("bridge did not connect");
    // Let the mock register its push channel for this session
    tokio::time::sleep(Duration::from_millis(50)).await;
    bridge
}

#[tokio::test]
async fn query_stock_round_trip() {
    let ims = MockIms::start().await;
    ims.set_stock(7, 5);
    let bridge = connected_bridge(&ims).await;

    assert_eq!(bridge.query_stock(7).await.unwrap(), 5);
    assert_eq!(bridge.pending_requests(), 0);
    bridge.disconnect();
}

#[tokio::test]
async fn update_stock_applies_signed_delta() {
    let ims = MockIms::start().await;
    ims.set_stock(7, 5);
    let bridge = connected_bridge(&ims).await;

    assert_eq!(bridge.update_stock(7, -2).await.unwrap(), 3);
    assert_eq!(bridge.update_stock(7, 4).await.unwrap(), 7);
    bridge.disconnect();
}

#[tokio::test]
async fn query_without_connection_fails_fast() {
    let ims = MockIms::start().await;
    let bridge = InventoryBridge::new(ims.config());

    match bridge.query_stock(7).await {
        Err(BridgeError::NotConnected) => {}
        other => panic!("expected NotConnected, got {other:?}"),
    }
    // Nothing was sent: the IMS never saw a connection
    assert_eq!(ims.connections(), 0);
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn unanswered_request_times_out_after_deadline() {
    let ims = MockIms::start().await;
    ims.state.swallow_requests.store(true, Ordering::SeqCst);
    let config = ims.config().with_request_timeout(Duration::from_millis(200));
    let bridge = InventoryBridge::new(config);
    bridge.connect();
    bridge.wait_connected(Duration::from_secs(2)).await.unwrap();

    let started = Instant::now();
    match bridge.query_stock(7).await {
        Err(BridgeError::Timeout) => {}
        other => panic!("expected Timeout, got {other:?}"),
    }
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(800), "fired late: {elapsed:?}");
    assert_eq!(bridge.pending_requests(), 0);
    bridge.disconnect();
}

#[tokio::test]
async fn second_request_for_same_key_is_conflict() {
    let ims = MockIms::start().await;
    ims.state.swallow_requests.store(true, Ordering::SeqCst);
    let config = ims.config().with_request_timeout(Duration::from_millis(300));
    let bridge = Arc::new(InventoryBridge::new(config));
    bridge.connect();
    bridge.wait_connected(Duration::from_secs(2)).await.unwrap();

    let first = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.query_stock(7).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    match bridge.query_stock(7).await {
        Err(BridgeError::Conflict(key)) => assert_eq!(key.to_string(), "stock_info_7"),
        other => panic!("expected Conflict, got {other:?}"),
    }
    // The first caller still owns its entry and times out normally
    match first.await.unwrap() {
        Err(BridgeError::Timeout) => {}
        other => panic!("expected Timeout for first caller, got {other:?}"),
    }
    bridge.disconnect();
}

#[tokio::test]
async fn disconnect_drains_in_flight_and_reconnect_recovers() {
    let ims = MockIms::start().await;
    ims.set_stock(7, 5);
    let bridge = connected_bridge(&ims).await;

    ims.state.drop_on_next_request.store(true, Ordering::SeqCst);
    match bridge.query_stock(7).await {
        Err(BridgeError::ConnectionClosed) => {}
        other => panic!("expected ConnectionClosed, got {other:?}"),
    }
    assert_eq!(bridge.pending_requests(), 0);

    // The supervisor reopens the channel after the fixed interval
    bridge.wait_connected(Duration::from_secs(2)).await.unwrap();
    assert_eq!(bridge.query_stock(7).await.unwrap(), 5);
    assert!(ims.connections() >= 2);
    bridge.disconnect();
}

#[tokio::test]
async fn caller_disconnect_suppresses_reconnect() {
    let ims = MockIms::start().await;
    let bridge = connected_bridge(&ims).await;
    assert_eq!(ims.connections(), 1);

    bridge.disconnect();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(ims.connections(), 1, "bridge must not self-heal after disconnect()");
    assert_eq!(bridge.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn dropped_bridge_stops_reconnecting() {
    let ims = MockIms::start().await;
    let bridge = connected_bridge(&ims).await;
    assert_eq!(ims.connections(), 1);

    drop(bridge);
    tokio::time::sleep(Duration::from_millis(650)).await;
    assert_eq!(
        ims.connections(),
        1,
        "worker must stop once its bridge is gone"
    );
}

#[tokio::test]
async fn connect_right_after_disconnect_restores_service() {
    let ims = MockIms::start().await;
    ims.set_stock(7, 5);
    let bridge = connected_bridge(&ims).await;

    bridge.disconnect();
    bridge.connect();
    bridge
        .wait_connected(Duration::from_secs(2))
        .await
        .expect("fresh worker must publish Connected after a caller disconnect");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.query_stock(7).await.unwrap(), 5);
    bridge.disconnect();
}

#[tokio::test]
async fn connect_is_idempotent() {
    let ims = MockIms::start().await;
    let bridge = connected_bridge(&ims).await;

    bridge.connect();
    bridge.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ims.connections(), 1);
    bridge.disconnect();
}

#[tokio::test]
async fn stock_changed_fans_out_to_live_observers_only() {
    let ims = MockIms::start().await;
    let bridge = connected_bridge(&ims).await;

    let (_a, mut rx_a) = bridge.subscribe_events(8);
    let (_b, mut rx_b) = bridge.subscribe_events(8);
    let (_c, rx_c) = bridge.subscribe_events(8);
    drop(rx_c);

    ims.push(ImsMessage::StockChanged {
        item_id: 3,
        current_quantity: 12,
        delta: 4,
    });

    let ev_a = tokio::time::timeout(Duration::from_secs(1), rx_a.recv())
        .await
        .unwrap()
        .unwrap();
    let ev_b = tokio::time::timeout(Duration::from_secs(1), rx_b.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ev_a.item_id, 3);
    assert_eq!(ev_b.current_quantity, 12);
    assert_eq!(bridge.observer_count(), 2, "dead observer dropped after pass");
    bridge.disconnect();
}

#[tokio::test]
async fn own_update_reply_is_not_rebroadcast() {
    let ims = MockIms::start().await;
    ims.set_stock(7, 5);
    let bridge = connected_bridge(&ims).await;
    let (_id, mut rx) = bridge.subscribe_events(8);

    bridge.update_stock(7, -2).await.unwrap();

    // The acknowledgement resolved the waiter; observers see nothing
    let quiet = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(quiet.is_err(), "update reply leaked to observers");

    // A genuine broadcast still arrives
    ims.push(ImsMessage::StockChanged {
        item_id: 7,
        current_quantity: 3,
        delta: -2,
    });
    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.item_id, 7);
    bridge.disconnect();
}

#[tokio::test]
async fn unmatched_reply_is_dropped_without_damage() {
    let ims = MockIms::start().await;
    ims.set_stock(7, 5);
    let bridge = connected_bridge(&ims).await;

    // Reply nobody asked for
    ims.push(ImsMessage::StockInfo {
        item_id: 99,
        current_quantity: 1,
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(bridge.pending_requests(), 0);
    assert_eq!(bridge.query_stock(7).await.unwrap(), 5);
    bridge.disconnect();
}

#[tokio::test]
async fn cancelled_call_treats_late_reply_as_noop() {
    let ims = MockIms::start().await;
    ims.state.swallow_requests.store(true, Ordering::SeqCst);
    let bridge = connected_bridge(&ims).await;

    let cancel = CancellationToken::new();
    let trigger = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        }
    });

    match bridge.query_stock_with_cancel(7, &cancel).await {
        Err(BridgeError::Cancelled) => {}
        other => panic!("expected Cancelled, got {other:?}"),
    }
    trigger.await.unwrap();

    // The entry stays registered until the late reply arrives...
    assert_eq!(bridge.pending_requests(), 1);
    ims.push(ImsMessage::StockInfo {
        item_id: 7,
        current_quantity: 5,
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    // ...which resolves into the dropped receiver: a no-op
    assert_eq!(bridge.pending_requests(), 0);
    bridge.disconnect();
}

#[tokio::test]
async fn rejection_with_item_id_fails_the_waiting_caller() {
    let ims = MockIms::start().await;
    ims.state.swallow_requests.store(true, Ordering::SeqCst);
    let bridge = connected_bridge(&ims).await;

    let handle = tokio::spawn({
        let sessions = ims.state.sessions.lock().unwrap().clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            for tx in sessions.iter() {
                let _ = tx.send(ImsMessage::Error {
                    message: "unknown item".into(),
                    item_id: Some(7),
                });
            }
        }
    });

    match bridge.query_stock(7).await {
        Err(BridgeError::Rejected(msg)) => assert_eq!(msg, "unknown item"),
        other => panic!("expected Rejected, got {other:?}"),
    }
    handle.await.unwrap();
    assert_eq!(bridge.pending_requests(), 0);
    bridge.disconnect();
}
