use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors surfaced by the registration and transport-data HTTP/WS
/// endpoints, distinct from [`viss_registry::DispatchError`] which only
/// ever produces a VISS error envelope, never an HTTP status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("protocol not supported")]
    UnsupportedProtocol,

    #[error("malformed registration body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Registry(#[from] viss_registry::RegistryError),

    #[error("upgrade header is not websocket")]
    NotAWebSocketUpgrade,
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let status = match self {
            TransportError::UnsupportedProtocol => StatusCode::NOT_FOUND,
            TransportError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            TransportError::Registry(_) => StatusCode::BAD_REQUEST,
            TransportError::NotAWebSocketUpgrade => StatusCode::BAD_REQUEST,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
