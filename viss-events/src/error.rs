use thiserror::Error;

/// Errors from routing a subscription event through the backplane.
#[derive(Debug, Error)]
pub enum EventsError {
    #[error("no transport backend registered for manager index {0}")]
    Unregistered(u16),

    #[error("backend channel for manager index {0} is closed")]
    Closed(u16),
}
