use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

use viss_events::SubscriptionBackplane;
use viss_registry::RouterTable;
use viss_security::{AccessVerifier, SecurityConfig};
use viss_server::config::ServerConfig;
use viss_server::state::{AppState, ChannelServiceSender, TransportSlot};
use viss_server::{dispatch_loop, service_registration_router, telemetry, transport_data_router, transport_registration_router};
use viss_vss::VssTree;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = ServerConfig::parse();

    let vss = match VssTree::load(&config.vss_schema_path) {
        Ok(tree) => tree,
        Err(err) => {
            error!(error = %err, path = %config.vss_schema_path, "failed to load VSS schema, exiting");
            std::process::exit(1);
        }
    };

    if let Err(err) = write_leaf_path_list(&vss, &config.leaf_path_list_path) {
        error!(error = %err, path = %config.leaf_path_list_path, "failed to write leaf path list, exiting");
        std::process::exit(1);
    }

    let config = Arc::new(config);
    let vss = Arc::new(vss);
    let router = Arc::new(RouterTable::new(config.max_services));
    let verifier = Arc::new(AccessVerifier::new(
        SecurityConfig::new(config.atserver_base_url.clone())
            .with_verify_timeout(std::time::Duration::from_secs(config.verify_timeout_secs)),
    ));
    let backplane = SubscriptionBackplane::new();
    let services = ChannelServiceSender::new();

    let mut transports = Vec::with_capacity(config.supported_protocols.len());
    let mut receivers = Vec::with_capacity(config.supported_protocols.len());
    for protocol in &config.supported_protocols {
        let (tx, rx) = mpsc::channel(64);
        transports.push(TransportSlot {
            protocol: protocol.clone(),
            request_tx: tx,
        });
        receivers.push(rx);
    }

    let state = AppState::new(config.clone(), vss, router, verifier, backplane, transports, services);

    for (mgr_index, rx) in receivers.into_iter().enumerate() {
        let state = state.clone();
        tokio::spawn(dispatch_loop::run(state, mgr_index as u16, rx));
    }

    let mut servers = Vec::new();

    let transport_reg_addr = SocketAddr::from(([0, 0, 0, 0], config.transport_reg_port));
    let transport_reg_state = state.clone();
    servers.push(tokio::spawn(async move {
        serve_with_connect_info(transport_reg_addr, transport_registration_router(transport_reg_state)).await;
    }));

    let service_reg_addr = SocketAddr::from(([0, 0, 0, 0], config.service_reg_port));
    let service_reg_state = state.clone();
    servers.push(tokio::spawn(async move {
        serve_with_connect_info(service_reg_addr, service_registration_router(service_reg_state)).await;
    }));

    for mgr_index in 0..state.transports.len() {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.transport_data_port(mgr_index as u16)));
        let data_state = state.clone();
        servers.push(tokio::spawn(async move {
            serve_with_connect_info(addr, transport_data_router(data_state)).await;
        }));
    }

    info!(
        transports = state.transports.len(),
        "viss-server core started"
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        _ = futures_util::future::join_all(servers) => {
            error!("a listener task exited unexpectedly");
        }
    }
}

async fn serve_with_connect_info(addr: SocketAddr, app: axum::Router) {
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!(%addr, "listening");
            if let Err(err) = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                error!(%addr, error = %err, "server error");
            }
        }
        Err(err) => {
            error!(%addr, error = %err, "failed to bind, exiting");
            std::process::exit(1);
        }
    }
}

fn write_leaf_path_list(vss: &VssTree, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let leaves = vss.enumerate_leaf_paths(&vss.root());
    let body = serde_json::json!({ "LeafPaths": leaves });
    std::fs::write(path, serde_json::to_vec_pretty(&body)?)?;
    Ok(())
}
