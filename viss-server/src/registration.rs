//! Component 4.D — transport and service manager registration endpoints.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::service_client::spawn_service_client;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransportRegRequest {
    #[serde(rename = "Protocol")]
    pub protocol: String,
}

#[derive(Debug, Serialize)]
pub struct TransportRegResponse {
    #[serde(rename = "Portnum")]
    pub portnum: u16,
    #[serde(rename = "Urlpath")]
    pub urlpath: String,
    #[serde(rename = "Mgrid")]
    pub mgrid: u16,
}

pub async fn transport_register(
    State(state): State<AppState>,
    Json(body): Json<TransportRegRequest>,
) -> Result<Json<TransportRegResponse>, TransportError> {
    let Some(mgr_index) = state
        .transports
        .iter()
        .position(|slot| slot.protocol == body.protocol)
    else {
        warn!(protocol = %body.protocol, "registration for unsupported protocol");
        return Err(TransportError::UnsupportedProtocol);
    };
    let mgr_index = mgr_index as u16;
    let mgr_id: u16 = rand::thread_rng().gen();
    state.router.add_transport(mgr_id, mgr_index).await?;

    info!(protocol = %body.protocol, mgr_index, mgr_id, "transport manager registered");
    Ok(Json(TransportRegResponse {
        portnum: state.config.transport_data_port(mgr_index),
        urlpath: format!("/transport/data/{mgr_index}"),
        mgrid: mgr_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ServiceRegRequest {
    #[serde(rename = "Rootnode")]
    pub rootnode: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceRegResponse {
    #[serde(rename = "Portnum")]
    pub portnum: u16,
    #[serde(rename = "Urlpath")]
    pub urlpath: String,
}

pub async fn service_register(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Json(body): Json<ServiceRegRequest>,
) -> Result<Json<ServiceRegResponse>, TransportError> {
    let index = state.router.reserve_service_index();
    if index >= state.router.max_services() {
        warn!(index, max = state.router.max_services(), "service registration capacity exceeded, ignoring");
        return Ok(Json(ServiceRegResponse {
            portnum: state.config.service_data_port(index),
            urlpath: format!("/service/data/{index}"),
        }));
    }

    let remote_ip = remote.ip().to_string();
    state
        .router
        .register_service(index, body.rootnode.clone(), remote_ip.clone())
        .await?;

    let (tx, rx) = mpsc::channel(32);
    state.services.register(index, tx);

    let delay = Duration::from_secs(state.config.service_dial_delay_secs);
    let port = state.config.service_data_port(index);
    let app_state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        spawn_service_client(app_state, index, remote_ip, port, rx).await;
    });

    info!(index, root = %body.rootnode, "service manager registered");
    Ok(Json(ServiceRegResponse {
        portnum: port,
        urlpath: format!("/service/data/{index}"),
    }))
}
