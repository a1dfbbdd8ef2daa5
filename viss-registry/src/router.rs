use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::RegistryError;

#[derive(Debug, Clone)]
struct ServiceEntry {
    index: usize,
    root: String,
    remote_ip: String,
}

/// Explicit, process-local routing state (spec.md §9's "global mutable
/// router table" design note, addressed by making this an owned object
/// passed to the dispatcher rather than a package-level global).
///
/// Both tables are append-only: a single registration handler writes,
/// the dispatcher and service demux read without taking a write lock
/// for longer than an append (spec.md §5).
pub struct RouterTable {
    transports: RwLock<Vec<(u16, u16)>>,
    services: RwLock<Vec<ServiceEntry>>,
    next_transport_index: AtomicU16,
    next_service_index: AtomicUsize,
    max_services: usize,
}

impl RouterTable {
    pub fn new(max_services: usize) -> Self {
        RouterTable {
            transports: RwLock::new(Vec::new()),
            services: RwLock::new(Vec::new()),
            next_transport_index: AtomicU16::new(0),
            next_service_index: AtomicUsize::new(0),
            max_services,
        }
    }

    /// Reserve the next transport-manager index (one per registered
    /// protocol, per spec.md §4.D).
    pub fn reserve_transport_index(&self) -> u16 {
        self.next_transport_index.fetch_add(1, Ordering::SeqCst)
    }

    /// Reserve the next service index. The caller must check it against
    /// `max_services` before registering — indices at or past capacity
    /// are valid to reserve (monotonic counter) but `register_service`
    /// will refuse them.
    pub fn reserve_service_index(&self) -> usize {
        self.next_service_index.fetch_add(1, Ordering::SeqCst)
    }

    pub fn max_services(&self) -> usize {
        self.max_services
    }

    /// Record a transport registration. Re-registration under an id
    /// already present is rejected — spec.md §4's state machine does not
    /// support re-registration.
    pub async fn add_transport(&self, mgr_id: u16, mgr_index: u16) -> Result<(), RegistryError> {
        let mut transports = self.transports.write().await;
        if transports.iter().any(|(id, _)| *id == mgr_id) {
            return Err(RegistryError::DuplicateManagerId(mgr_id));
        }
        transports.push((mgr_id, mgr_index));
        info!(mgr_id, mgr_index, "transport registered");
        Ok(())
    }

    /// Reverse lookup used by the service-side subscription-event demux
    /// (spec.md §4.F).
    pub async fn lookup_transport(&self, mgr_id: u16) -> Option<u16> {
        self.transports
            .read()
            .await
            .iter()
            .find(|(id, _)| *id == mgr_id)
            .map(|(_, idx)| *idx)
    }

    /// Record a service registration. Silently-ignored-at-capacity
    /// behavior (spec.md §9 Open Behavior and §8 boundary case) is
    /// surfaced here as an `Err` so the registration handler can log and
    /// decline without updating any state.
    pub async fn register_service(
        &self,
        index: usize,
        root: String,
        remote_ip: String,
    ) -> Result<(), RegistryError> {
        if index >= self.max_services {
            warn!(index, max = self.max_services, "service registration at capacity, ignoring");
            return Err(RegistryError::ServiceCapacityExceeded {
                max: self.max_services,
            });
        }
        let mut services = self.services.write().await;
        services.push(ServiceEntry {
            index,
            root,
            remote_ip,
        });
        info!(index, "service registered");
        Ok(())
    }

    /// Root path registered for `index`, if any.
    pub async fn service_root(&self, index: usize) -> Option<String> {
        self.services
            .read()
            .await
            .iter()
            .find(|e| e.index == index)
            .map(|e| e.root.clone())
    }

    pub async fn service_count(&self) -> usize {
        self.services.read().await.len()
    }

    /// Select the service owning a resolved leaf path.
    ///
    /// spec.md §9 Open Behavior (a) leaves this undecided upstream — the
    /// original always forwards to service 0. That strategy is preserved
    /// verbatim here rather than guessed at; see DESIGN.md.
    pub async fn select_service(&self, _resolved_path: &str) -> usize {
        0
    }
}
