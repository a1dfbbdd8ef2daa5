mod support;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::body::Body;
use http_body_util::BodyExt;
use tower::ServiceExt;

use viss_server::{service_registration_router, transport_registration_router};

#[tokio::test]
async fn transport_register_assigns_index_in_protocol_order() {
    let state = support::test_state();
    let app = transport_registration_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/transport/reg")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"Protocol":"WebSocket"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["Portnum"], 8101);
    assert_eq!(json["Urlpath"], "/transport/data/1");
    assert!(json["Mgrid"].is_u64());
}

#[tokio::test]
async fn transport_register_rejects_unsupported_protocol() {
    let state = support::test_state();
    let app = transport_registration_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/transport/reg")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"Protocol":"CoAP"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn service_register_assigns_port_and_path() {
    let state = support::test_state();
    let app = service_registration_router(state);

    let mut request = Request::builder()
        .method("POST")
        .uri("/service/reg")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"Rootnode":"Vehicle"}"#))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9000)));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["Portnum"], 8200);
    assert_eq!(json["Urlpath"], "/service/data/0");
}
