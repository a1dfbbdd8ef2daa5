use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Initialise the global `tracing` subscriber.
///
/// Respects `RUST_LOG`; falls back to `info,tower_http=debug` so request
/// tracing is visible without extra configuration. Call once at the top
/// of `main`, before any tracing macro fires.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".parse().unwrap()),
        )
        .init();
}

pub fn trace_layer() -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}
