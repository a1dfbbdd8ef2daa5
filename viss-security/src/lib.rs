//! Bearer-token access verification.
//!
//! Delegates signature verification to an external access-token server
//! and checks the token's `scp` claim locally, matching the access
//! levels spec.md §4.G defines for read and write requests.

mod config;
mod error;
mod verifier;

pub use config::SecurityConfig;
pub use error::SecurityError;
pub use verifier::{AccessLevel, AccessVerifier};
