//! Subscription-event demultiplexing backplane.
//!
//! Subscription events arrive on a service's read-pump and must reach the
//! originating transport's socket without transiting the request
//! dispatcher (spec.md §2). This crate is the registry that makes that
//! routing possible.

mod backplane;
mod error;

pub use backplane::SubscriptionBackplane;
pub use error::EventsError;
