//! Inventory-change push channel.
//!
//! Each connected terminal becomes one bridge observer; events arrive as
//! JSON text frames. A terminal that stops draining its socket falls
//! behind, gets its channel closed by the registry, and is disconnected.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use crate::core::state::ServerState;

const EVENT_QUEUE: usize = 32;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ServerState) {
    let (id, mut events) = state.bridge.subscribe_events(EVENT_QUEUE);
    tracing::info!(observer = %id, "terminal connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize inventory event");
                        continue;
                    }
                };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            frame = stream.next() => {
                match frame {
                    // Terminals only listen; answer pings, ignore the rest.
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.bridge.remove_observer(id);
    tracing::info!(observer = %id, "terminal disconnected");
}
