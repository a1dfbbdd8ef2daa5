use thiserror::Error;

use viss_security::SecurityError;

use crate::envelope::{RequestEnvelope, ResponseEnvelope};

/// Errors from registering transports/services in the [`RouterTable`](crate::RouterTable).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("manager id {0} is already registered")]
    DuplicateManagerId(u16),

    #[error("service table is at capacity ({max} services)")]
    ServiceCapacityExceeded { max: usize },
}

/// Errors surfaced by the request dispatcher, one per spec.md §7 error kind.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No signals matching path.")]
    PathNotFound,

    #[error(transparent)]
    AccessDenied(#[from] SecurityError),

    #[error("Data not matching query.")]
    QueryDataMismatch,

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("access-restriction tag {0} is invalid")]
    AccessTagInvalid(u8),

    #[error("unknown action")]
    UnknownAction,

    #[error("upstream service unreachable")]
    UpstreamServiceUnreachable,
}

impl DispatchError {
    /// The `{number, reason}` pair spec.md §7 assigns this error kind.
    /// `message` text matches §7/§4.G's literal wire strings.
    pub fn to_envelope(&self, request: &RequestEnvelope, timestamp: impl Into<String>) -> ResponseEnvelope {
        let (number, reason, message): (&str, &str, String) = match self {
            DispatchError::PathNotFound => ("400", "path-not-found", self.to_string()),
            DispatchError::AccessDenied(security) => (
                "400",
                "access-denied",
                match security {
                    SecurityError::MissingToken => "Token missing.".to_string(),
                    other => other.message().to_string(),
                },
            ),
            DispatchError::QueryDataMismatch => ("400", "query-data-mismatch", self.to_string()),
            DispatchError::MalformedRequest(_) => ("400", "malformed-request", self.to_string()),
            DispatchError::AccessTagInvalid(_) => ("400", "access-tag-invalid", self.to_string()),
            DispatchError::UnknownAction => ("400", "unknown-action", self.to_string()),
            DispatchError::UpstreamServiceUnreachable => {
                ("400", "upstream-service-unreachable", self.to_string())
            }
        };
        ResponseEnvelope::error_for(request, number, reason, &message, timestamp)
    }
}
