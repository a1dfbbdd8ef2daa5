use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::EventsError;

/// Demultiplexes asynchronous subscription events to the transport
/// connection that originated them, bypassing the request dispatcher
/// entirely (spec.md §2, §4.F).
///
/// Keyed by manager-index rather than manager-id: the router table
/// already resolves manager-id → manager-index for the service read-pump
/// (spec.md §4.F step "reverse lookup on MgrId"), so this registry only
/// needs to know which live backend channel belongs to which connected
/// transport.
#[derive(Clone, Default)]
pub struct SubscriptionBackplane {
    backends: std::sync::Arc<DashMap<u16, mpsc::Sender<String>>>,
}

impl SubscriptionBackplane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the backend channel for a newly connected transport. A
    /// second registration under the same index (reconnect without a
    /// clean unregister) replaces the old sender outright.
    pub fn register(&self, mgr_index: u16, sender: mpsc::Sender<String>) {
        debug!(mgr_index, "backplane: registering transport backend");
        self.backends.insert(mgr_index, sender);
    }

    /// Remove a transport's backend channel, e.g. on socket close.
    pub fn unregister(&self, mgr_index: u16) {
        debug!(mgr_index, "backplane: unregistering transport backend");
        self.backends.remove(&mgr_index);
    }

    /// Route one subscription-event message to the transport at
    /// `mgr_index`'s backend channel.
    pub async fn route(&self, mgr_index: u16, message: String) -> Result<(), EventsError> {
        let sender = self
            .backends
            .get(&mgr_index)
            .map(|entry| entry.value().clone())
            .ok_or(EventsError::Unregistered(mgr_index))?;
        sender.send(message).await.map_err(|_| {
            warn!(mgr_index, "backplane: backend channel closed");
            EventsError::Closed(mgr_index)
        })
    }

    pub fn is_registered(&self, mgr_index: u16) -> bool {
        self.backends.contains_key(&mgr_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_to_registered_backend() {
        let backplane = SubscriptionBackplane::new();
        let (tx, mut rx) = mpsc::channel(4);
        backplane.register(0, tx);

        backplane.route(0, "event".to_string()).await.unwrap();
        assert_eq!(rx.recv().await, Some("event".to_string()));
    }

    #[tokio::test]
    async fn routing_to_unregistered_index_errors() {
        let backplane = SubscriptionBackplane::new();
        let err = backplane.route(3, "event".to_string()).await.unwrap_err();
        assert!(matches!(err, EventsError::Unregistered(3)));
    }

    #[tokio::test]
    async fn unregister_removes_the_backend() {
        let backplane = SubscriptionBackplane::new();
        let (tx, _rx) = mpsc::channel(4);
        backplane.register(1, tx);
        assert!(backplane.is_registered(1));
        backplane.unregister(1);
        assert!(!backplane.is_registered(1));
    }

    #[tokio::test]
    async fn routing_after_receiver_dropped_errors_closed() {
        let backplane = SubscriptionBackplane::new();
        let (tx, rx) = mpsc::channel(4);
        backplane.register(2, tx);
        drop(rx);
        let err = backplane.route(2, "event".to_string()).await.unwrap_err();
        assert!(matches!(err, EventsError::Closed(2)));
    }
}
