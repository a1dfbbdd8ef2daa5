use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use viss_events::SubscriptionBackplane;
use viss_registry::RouterTable;
use viss_security::{AccessVerifier, SecurityConfig};
use viss_server::config::ServerConfig;
use viss_server::state::{AppState, ChannelServiceSender, DispatchRequest, TransportSlot};
use viss_vss::VssTree;

const SAMPLE_SCHEMA: &str = r#"{
  "name": "Vehicle",
  "type": "branch",
  "children": [
    { "name": "Speed", "type": "sensor", "datatype": "float" }
  ]
}"#;

/// Build a minimal [`AppState`] with two transport protocols ("HTTP",
/// "WebSocket") and no registered services, suitable for exercising the
/// registration endpoints and the transport frontend/backend pumps.
pub fn test_state() -> AppState {
    test_state_with_receivers().0
}

/// Like [`test_state`] but also returns each transport's request receiver,
/// for tests that need to drive a fake dispatch loop by hand.
pub fn test_state_with_receivers() -> (AppState, Vec<mpsc::Receiver<DispatchRequest>>) {
    let mut schema_file = NamedTempFile::new().expect("create temp schema file");
    schema_file
        .write_all(SAMPLE_SCHEMA.as_bytes())
        .expect("write schema");

    let config = ServerConfig::parse_from([
        "viss-server",
        "--vss-schema-path",
        schema_file.path().to_str().unwrap(),
        "--leaf-path-list-path",
        "/dev/null",
    ]);

    let vss = Arc::new(VssTree::load(&config.vss_schema_path).expect("load schema"));
    drop(schema_file);
    let router = Arc::new(RouterTable::new(config.max_services));
    let verifier = Arc::new(AccessVerifier::new(SecurityConfig::new(
        config.atserver_base_url.clone(),
    )));
    let backplane = SubscriptionBackplane::new();
    let services = ChannelServiceSender::new();

    let mut transports = Vec::new();
    let mut receivers = Vec::new();
    for protocol in &config.supported_protocols {
        let (tx, rx) = mpsc::channel(8);
        transports.push(TransportSlot {
            protocol: protocol.clone(),
            request_tx: tx,
        });
        receivers.push(rx);
    }

    let state = AppState::new(
        Arc::new(config),
        vss,
        router,
        verifier,
        backplane,
        transports,
        services,
    );
    (state, receivers)
}
