use clap::Parser;

/// VISS Gen2 server core configuration, populated from environment
/// variables (`VISS_`-prefixed) with CLI flags taking precedence.
///
/// Field defaults match the port numbers and file paths spec.md §6
/// assigns.
#[derive(Parser, Debug, Clone)]
#[command(name = "viss-server", version, about = "VISS Gen2 server core")]
pub struct ServerConfig {
    /// Port serving `POST /transport/reg`.
    #[arg(long, env = "VISS_TRANSPORT_REG_PORT", default_value_t = 8081)]
    pub transport_reg_port: u16,

    /// Port serving `POST /service/reg`.
    #[arg(long, env = "VISS_SERVICE_REG_PORT", default_value_t = 8082)]
    pub service_reg_port: u16,

    /// First port in the transport-data WebSocket range
    /// (`base_transport_port + mgrIndex`).
    #[arg(long, env = "VISS_BASE_TRANSPORT_PORT", default_value_t = 8100)]
    pub base_transport_port: u16,

    /// First port in the service-data WebSocket range
    /// (`base_service_port + serviceIndex`).
    #[arg(long, env = "VISS_BASE_SERVICE_PORT", default_value_t = 8200)]
    pub base_service_port: u16,

    /// Base URL of the access-token server (`POST {base}/atserver`).
    #[arg(long, env = "VISS_ATSERVER_BASE_URL", default_value = "http://127.0.0.1:8600")]
    pub atserver_base_url: String,

    /// Path to the JSON VSS schema document loaded at startup.
    #[arg(long, env = "VISS_VSS_SCHEMA_PATH", default_value = "vss_tree.json")]
    pub vss_schema_path: String,

    /// Path the sorted leaf-path list is written to at startup.
    #[arg(long, env = "VISS_LEAF_PATH_LIST_PATH", default_value = "../vsspathlist.json")]
    pub leaf_path_list_path: String,

    /// Path to the (opaque, unvalidated) purpose list JSON document.
    #[arg(long, env = "VISS_PURPOSE_LIST_PATH", default_value = "purposelist.json")]
    pub purpose_list_path: String,

    /// Maximum number of service managers the router table accepts.
    #[arg(long, env = "VISS_MAX_SERVICES", default_value_t = 2)]
    pub max_services: usize,

    /// Protocols the transport-registration endpoint accepts, in
    /// registration order (registration order fixes `mgrIndex`).
    #[arg(long, env = "VISS_SUPPORTED_PROTOCOLS", value_delimiter = ',', default_values_t = [String::from("HTTP"), String::from("WebSocket")])]
    pub supported_protocols: Vec<String>,

    /// Delay before dialing a newly registered service manager, allowing
    /// its data server time to bind (spec.md §4.D).
    #[arg(long, env = "VISS_SERVICE_DIAL_DELAY_SECS", default_value_t = 3)]
    pub service_dial_delay_secs: u64,

    /// Timeout applied to each access-verifier HTTP call (spec.md §5).
    #[arg(long, env = "VISS_VERIFY_TIMEOUT_SECS", default_value_t = 10)]
    pub verify_timeout_secs: u64,
}

impl ServerConfig {
    pub fn transport_data_port(&self, mgr_index: u16) -> u16 {
        self.base_transport_port + mgr_index
    }

    pub fn service_data_port(&self, service_index: usize) -> u16 {
        self.base_service_port + service_index as u16
    }
}
