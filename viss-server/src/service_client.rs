//! Component 4.F — outbound WebSocket client toward a registered service
//! manager. One persistent connection per service index, dialed a fixed
//! delay after registration (spec.md §4.D/§5).

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use viss_registry::{RequestEnvelope, ServiceReply};

use crate::state::AppState;

type ServiceCall = (RequestEnvelope, oneshot::Sender<ServiceReply>);
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ServiceReply>>>>;

/// Dial the service and drive its write/read halves until the socket
/// closes. Per spec.md §7, a downed service socket is not reconnected —
/// every request already queued or subsequently routed here simply fails
/// with an upstream error once its sender is dropped.
pub async fn spawn_service_client(
    state: AppState,
    index: usize,
    remote_ip: String,
    port: u16,
    request_rx: mpsc::Receiver<ServiceCall>,
) {
    let url = format!("ws://{remote_ip}:{port}/service/data/{index}");
    let stream = match tokio_tungstenite::connect_async(&url).await {
        Ok((stream, _)) => stream,
        Err(err) => {
            error!(index, %url, error = %err, "service dial failed");
            return;
        }
    };
    info!(index, %url, "service data client connected");

    let (mut write, mut read) = stream.split();
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

    let writer_pending = pending.clone();
    let mut request_rx = request_rx;
    let writer = tokio::spawn(async move {
        while let Some((request, reply_tx)) = request_rx.recv().await {
            let request_id = request.request_id.clone();
            let payload = match serde_json::to_string(&request) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(index, error = %err, "failed to serialize outbound request");
                    continue;
                }
            };
            writer_pending.lock().await.insert(request_id.clone(), reply_tx);
            if let Err(err) = write.send(Message::Text(payload.into())).await {
                warn!(index, error = %err, "service socket write failed");
                writer_pending.lock().await.remove(&request_id);
                break;
            }
        }
    });

    let reader_pending = pending.clone();
    let reader = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text.to_string(),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    warn!(index, error = %err, "service socket read failed");
                    break;
                }
            };
            let parsed: serde_json::Value = match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(err) => {
                    warn!(index, error = %err, "malformed service reply");
                    continue;
                }
            };
            let action = parsed.get("action").and_then(|v| v.as_str());
            if action == Some("subscription") {
                let mgr_id = parsed.get("MgrId").and_then(|v| v.as_u64()).map(|v| v as u16);
                if let Some(mgr_id) = mgr_id {
                    if let Some(mgr_index) = state.router.lookup_transport(mgr_id).await {
                        if let Err(err) = state.backplane.route(mgr_index, text).await {
                            warn!(index, mgr_index, error = %err, "subscription demux failed");
                        }
                    } else {
                        warn!(index, mgr_id, "subscription event for unknown manager id");
                    }
                } else {
                    warn!(index, "subscription event missing MgrId");
                }
                continue;
            }

            let request_id = parsed.get("requestId").and_then(|v| v.as_str()).map(str::to_owned);
            let Some(request_id) = request_id else {
                warn!(index, "service reply missing requestId, dropping");
                continue;
            };
            let reply: ServiceReply = match serde_json::from_value(parsed) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(index, error = %err, "could not decode service reply");
                    continue;
                }
            };
            if let Some(sender) = reader_pending.lock().await.remove(&request_id) {
                let _ = sender.send(reply);
            }
        }

        // Socket closed or errored: drop every outstanding sender so
        // waiting callers observe a closed oneshot instead of blocking
        // forever (spec.md §4.F/§7 "skeleton error envelope").
        reader_pending.lock().await.clear();
    });

    let _ = tokio::join!(writer, reader);
    warn!(index, "service data client disconnected");
}
