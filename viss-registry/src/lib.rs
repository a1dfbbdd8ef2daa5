//! Router table, request/response envelopes, aggregation, and the request
//! dispatcher — the parts of the VISS Gen2 core that sit between the
//! transport/service socket plumbing (`viss-server`) and the VSS tree
//! (`viss-vss`) and access verifier (`viss-security`).

mod aggregate;
mod dispatcher;
mod envelope;
mod error;
mod router;

pub use aggregate::{aggregate, Accepted, Aggregated};
pub use dispatcher::{Dispatcher, ServiceSender};
pub use envelope::{Action, ErrorDetail, RequestEnvelope, ResponseEnvelope, ServiceReply};
pub use error::{DispatchError, RegistryError};
pub use router::RouterTable;
