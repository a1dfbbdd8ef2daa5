//! Component 4.E — per-protocol transport data WebSocket endpoint.
//!
//! Each accepted connection spawns two independent pumps (spec.md §4.E):
//! a frontend pump that rendezvous-sends each inbound request to the
//! dispatcher and forwards the reply onto the backend channel, and a
//! backend pump that drains that channel to the socket. The split keeps
//! asynchronous subscription events (pushed directly onto the backend
//! channel by the service demux, bypassing the dispatcher) flowing to the
//! socket without contention from the request/reply path.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use viss_registry::RequestEnvelope;

use crate::error::TransportError;
use crate::state::AppState;

pub async fn transport_data(
    ws: WebSocketUpgrade,
    Path(mgr_index): Path<u16>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, TransportError> {
    if state.transports.get(mgr_index as usize).is_none() {
        return Err(TransportError::UnsupportedProtocol);
    }
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, mgr_index, state)))
}

async fn handle_connection(socket: WebSocket, mgr_index: u16, state: AppState) {
    let (backend_tx, backend_rx) = mpsc::channel::<String>(64);
    state.backplane.register(mgr_index, backend_tx.clone());

    let (sink, stream) = socket.split();
    let backend = tokio::spawn(backend_pump(sink, backend_rx));
    frontend_pump(stream, mgr_index, &state, backend_tx).await;

    state.backplane.unregister(mgr_index);
    let _ = backend.await;
    debug!(mgr_index, "transport connection closed");
}

async fn frontend_pump(
    mut stream: futures_util::stream::SplitStream<WebSocket>,
    mgr_index: u16,
    state: &AppState,
    backend_tx: mpsc::Sender<String>,
) {
    let Some(slot) = state.transports.get(mgr_index as usize) else {
        return;
    };
    let request_tx = slot.request_tx.clone();

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                warn!(mgr_index, error = %err, "transport socket read failed");
                break;
            }
        };

        let request: RequestEnvelope = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(err) => {
                warn!(mgr_index, error = %err, "malformed request envelope, dropping connection");
                break;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if request_tx.send((request, reply_tx)).await.is_err() {
            warn!(mgr_index, "dispatch channel closed");
            break;
        }
        let Ok(response) = reply_rx.await else {
            warn!(mgr_index, "dispatcher dropped reply sender");
            break;
        };
        let payload = match serde_json::to_string(&response) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(mgr_index, error = %err, "failed to serialize response");
                continue;
            }
        };
        if backend_tx.send(payload).await.is_err() {
            break;
        }
    }
}

async fn backend_pump(
    mut sink: futures_util::stream::SplitSink<WebSocket, Message>,
    mut backend_rx: mpsc::Receiver<String>,
) {
    while let Some(text) = backend_rx.recv().await {
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}
