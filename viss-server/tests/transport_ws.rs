mod support;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use viss_registry::ResponseEnvelope;
use viss_server::transport_data_router;

async fn bind_ephemeral(router: axum::Router) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });
    port
}

#[tokio::test]
async fn frontend_pump_rendezvous_and_backend_pump_writes_reply() {
    let (state, mut receivers) = support::test_state_with_receivers();
    let mut rx = receivers.remove(0);

    // Stand in for the dispatcher: echo back a canned response envelope.
    tokio::spawn(async move {
        while let Some((request, reply_tx)) = rx.recv().await {
            let response = ResponseEnvelope::value_for(&request, "42", "2026-07-27T00:00:00Z");
            let _ = reply_tx.send(response);
        }
    });

    let port = bind_ephemeral(transport_data_router(state)).await;
    let url = format!("ws://127.0.0.1:{port}/transport/data/0");
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    let request = r#"{"action":"get","path":"Vehicle.Speed","requestId":"1","MgrId":0,"ClientId":"c"}"#;
    socket.send(Message::Text(request.into())).await.unwrap();

    let reply = socket.next().await.unwrap().unwrap();
    let text = reply.into_text().unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["requestId"], "1");
    assert_eq!(json["value"], "42");
}

#[tokio::test]
async fn subscription_event_reaches_socket_without_a_pending_request() {
    let (state, _receivers) = support::test_state_with_receivers();
    let backplane = state.backplane.clone();

    let port = bind_ephemeral(transport_data_router(state)).await;
    let url = format!("ws://127.0.0.1:{port}/transport/data/0");
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    // Give the server task a moment to register the backend channel.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    backplane
        .route(0, r#"{"action":"subscription","MgrId":17,"subscriptionId":"s1"}"#.to_string())
        .await
        .unwrap();

    let event = socket.next().await.unwrap().unwrap();
    let text = event.into_text().unwrap();
    assert!(text.contains("\"subscriptionId\":\"s1\""));
}
