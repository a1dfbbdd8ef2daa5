//! VISS Gen2 server core: registration, transport/service endpoints, and
//! the request dispatcher (spec.md §2).

pub mod config;
pub mod dispatch_loop;
pub mod error;
pub mod registration;
pub mod service_client;
pub mod state;
pub mod telemetry;
pub mod transport;

use axum::routing::{get, post};
use axum::Router;

use state::AppState;

/// Router serving `POST /transport/reg` (spec.md §4.D), meant to be bound
/// on its own dedicated port.
pub fn transport_registration_router(state: AppState) -> Router {
    Router::new()
        .route("/transport/reg", post(registration::transport_register))
        .layer(telemetry::trace_layer())
        .with_state(state)
}

/// Router serving `POST /service/reg` (spec.md §4.D). Requires the
/// listener to be served with `into_make_service_with_connect_info`
/// since the handler reads the caller's IP to dial back.
pub fn service_registration_router(state: AppState) -> Router {
    Router::new()
        .route("/service/reg", post(registration::service_register))
        .layer(telemetry::trace_layer())
        .with_state(state)
}

/// Router serving one transport protocol's `/transport/data/:mgr_index`
/// WebSocket endpoint (spec.md §4.E). Bound per-protocol, each on its own
/// port (`base_transport_port + mgr_index`).
pub fn transport_data_router(state: AppState) -> Router {
    Router::new()
        .route("/transport/data/{mgr_index}", get(transport::transport_data))
        .with_state(state)
}
