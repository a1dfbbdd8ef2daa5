use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use viss_events::SubscriptionBackplane;
use viss_registry::{Dispatcher, DispatchError, RequestEnvelope, ResponseEnvelope, RouterTable, ServiceReply, ServiceSender};
use viss_security::AccessVerifier;
use viss_vss::VssTree;

use crate::config::ServerConfig;

/// A request plus the reply channel the issuing frontend pump is waiting
/// on — the Rust stand-in for the original's "send on the channel, then
/// block reading the same channel for the reply" rendezvous (spec.md §9
/// suggests explicit correlation; a `oneshot` per request is that
/// correlation without the original's shared-channel reply race).
pub type DispatchRequest = (RequestEnvelope, oneshot::Sender<ResponseEnvelope>);

/// One pre-bound transport-data slot, one per supported protocol,
/// created at startup (spec.md §4.E/§9 — transport index is fixed by
/// protocol, not dynamically allocated at registration time).
pub struct TransportSlot {
    pub protocol: String,
    pub request_tx: mpsc::Sender<DispatchRequest>,
}

type ServiceCall = (RequestEnvelope, oneshot::Sender<ServiceReply>);

/// [`ServiceSender`] backed by per-service-index mpsc channels feeding the
/// outbound WebSocket client tasks (spec.md §4.F).
#[derive(Clone, Default)]
pub struct ChannelServiceSender {
    channels: Arc<DashMap<usize, mpsc::Sender<ServiceCall>>>,
}

impl ChannelServiceSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service_index: usize, tx: mpsc::Sender<ServiceCall>) {
        self.channels.insert(service_index, tx);
    }
}

impl ServiceSender for ChannelServiceSender {
    fn call(
        &self,
        service_index: usize,
        request: RequestEnvelope,
    ) -> impl std::future::Future<Output = Result<ServiceReply, DispatchError>> + Send {
        let channel = self.channels.get(&service_index).map(|e| e.value().clone());
        async move {
            let Some(tx) = channel else {
                return Err(DispatchError::UpstreamServiceUnreachable);
            };
            let (reply_tx, reply_rx) = oneshot::channel();
            if tx.send((request, reply_tx)).await.is_err() {
                warn!(service_index, "service data channel closed");
                return Err(DispatchError::UpstreamServiceUnreachable);
            }
            reply_rx.await.map_err(|_| {
                warn!(service_index, "service reply channel dropped");
                DispatchError::UpstreamServiceUnreachable
            })
        }
    }
}

/// Shared application state, cheap to clone (everything inside is an
/// `Arc` or itself already reference-counted).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub vss: Arc<VssTree>,
    pub router: Arc<RouterTable>,
    pub backplane: SubscriptionBackplane,
    pub transports: Arc<Vec<TransportSlot>>,
    pub services: ChannelServiceSender,
    pub dispatcher: Arc<Dispatcher<ChannelServiceSender>>,
}

impl AppState {
    pub fn new(
        config: Arc<ServerConfig>,
        vss: Arc<VssTree>,
        router: Arc<RouterTable>,
        verifier: Arc<AccessVerifier>,
        backplane: SubscriptionBackplane,
        transports: Vec<TransportSlot>,
        services: ChannelServiceSender,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            vss.clone(),
            router.clone(),
            verifier,
            services.clone(),
        ));
        AppState {
            config,
            vss,
            router,
            backplane,
            transports: Arc::new(transports),
            services,
            dispatcher,
        }
    }
}
