use std::sync::Arc;

use tracing::warn;
use viss_security::{AccessLevel, AccessVerifier};
use viss_vss::{self, AccessRestriction, FilterDescriptor, FilterName, VssTree};

use crate::aggregate::{aggregate, Accepted, Aggregated};
use crate::envelope::{Action, RequestEnvelope, ResponseEnvelope, ServiceReply};
use crate::error::DispatchError;
use crate::router::RouterTable;

/// Abstraction over "send this request to a service manager and await its
/// reply", so the dispatch logic in this crate stays free of the socket
/// plumbing that lives in `viss-server` — and is unit-testable against a
/// fake.
pub trait ServiceSender: Send + Sync {
    fn call(
        &self,
        service_index: usize,
        request: RequestEnvelope,
    ) -> impl std::future::Future<Output = Result<ServiceReply, DispatchError>> + Send;
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn find_filter(filters: &[FilterDescriptor], name: FilterName) -> Option<&FilterDescriptor> {
    filters.iter().find(|f| f.name == name)
}

/// The core request-dispatch loop (spec.md §4.H), generic over how a
/// resolved request actually reaches a service manager.
pub struct Dispatcher<S: ServiceSender> {
    vss: Arc<VssTree>,
    router: Arc<RouterTable>,
    verifier: Arc<AccessVerifier>,
    services: S,
}

impl<S: ServiceSender> Dispatcher<S> {
    pub fn new(
        vss: Arc<VssTree>,
        router: Arc<RouterTable>,
        verifier: Arc<AccessVerifier>,
        services: S,
    ) -> Self {
        Dispatcher {
            vss,
            router,
            verifier,
            services,
        }
    }

    /// Handle one request arriving on a transport channel, producing the
    /// single reply to push back on that same channel (spec.md §4.H).
    pub async fn dispatch(&self, request: RequestEnvelope) -> ResponseEnvelope {
        match self.try_dispatch(&request).await {
            Ok(response) => response,
            Err(err) => err.to_envelope(&request, now()),
        }
    }

    async fn try_dispatch(&self, request: &RequestEnvelope) -> Result<ResponseEnvelope, DispatchError> {
        if request.action == Action::Unsubscribe {
            let service_index = self.router.select_service(&request.path).await;
            let reply = self.services.call(service_index, request.clone()).await?;
            return Ok(ResponseEnvelope::from_reply(request, reply, now()));
        }

        let (filtered_path, filters) = viss_vss::process_filters(&request.path);
        let mut bare_path = viss_vss::remove_query(&filtered_path).to_string();
        let passthrough_query = viss_vss::add_query(&filtered_path).to_string();

        if request.action == Action::Get {
            if let Some(spec) = find_filter(&filters, FilterName::Spec) {
                let depth: usize = spec
                    .value
                    .trim()
                    .parse()
                    .map_err(|_| DispatchError::MalformedRequest(format!("invalid $spec depth {:?}", spec.value)))?;
                let root = self.vss.root();
                let any_depth = bare_path.ends_with('*');
                let result = self.vss.search(&root, &bare_path, 1, any_depth, false);
                let matched = result.matches.into_iter().next().ok_or(DispatchError::PathNotFound)?;
                let metadata = self.vss.metadata_tree(&matched.node, depth);
                return Ok(ResponseEnvelope::metadata_for(request, metadata, now()));
            }
        }

        if let Some(path_filter) = find_filter(&filters, FilterName::Path) {
            bare_path = format!("{bare_path}.{}", path_filter.value);
        }

        let root = self.vss.root();
        let any_depth = bare_path.ends_with('*');
        let result = self
            .vss
            .search(&root, &bare_path, viss_vss::MAX_MATCHES, any_depth, true);
        if result.matches.is_empty() {
            return Err(DispatchError::PathNotFound);
        }

        self.enforce_access(request, result.access_restriction).await?;

        let service_index = self.router.select_service(&bare_path).await;
        let data_filter = find_filter(&filters, FilterName::Data).map(|f| f.value.clone());

        let mut accepted = Vec::with_capacity(result.matches.len());
        for m in &result.matches {
            let mut leaf_request = request.clone();
            leaf_request.path = format!("{}{}", m.resolved_path, passthrough_query);
            let reply = self.services.call(service_index, leaf_request).await?;
            if let Some(expected) = &data_filter {
                if reply.value.as_deref() != Some(expected.as_str()) {
                    continue;
                }
            }
            accepted.push(Accepted {
                path: m.resolved_path.clone(),
                reply,
            });
        }

        match aggregate(accepted).ok_or(DispatchError::QueryDataMismatch)? {
            Aggregated::Single(reply) => Ok(ResponseEnvelope::from_reply(request, reply, now())),
            Aggregated::Multi(value) => Ok(ResponseEnvelope::value_for(request, value, now())),
        }
    }

    async fn enforce_access(
        &self,
        request: &RequestEnvelope,
        access: AccessRestriction,
    ) -> Result<(), DispatchError> {
        if access == AccessRestriction::None {
            return Ok(());
        }
        if access == AccessRestriction::WriteRestricted && request.action == Action::Get {
            return Ok(());
        }

        let token = request
            .authorization
            .as_deref()
            .ok_or(viss_security::SecurityError::MissingToken)?;

        let level = match access {
            AccessRestriction::WriteRestricted => AccessLevel::Write,
            AccessRestriction::ReadWriteRestricted => AccessLevel::Read,
            AccessRestriction::None => unreachable!(),
        };

        self.verifier.verify(token, level).await.map_err(|e| {
            warn!(error = %e, "access verification failed");
            DispatchError::from(e)
        })
    }
}
