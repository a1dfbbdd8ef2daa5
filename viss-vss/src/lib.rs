//! VSS tree adapter and query-filter parsing.
//!
//! This crate plays the role of the narrow interface spec.md §1 carves out
//! for the VSS tree parser library: it owns a pre-built signal tree, answers
//! path searches and metadata lookups, and never mutates the tree after
//! [`VssTree::load`]. It has no knowledge of transports, services, or
//! tokens — see `viss-registry` and `viss-security` for those.

mod error;
mod filter;
mod tree;

pub use error::VssError;
pub use filter::{process_filters, FilterDescriptor, FilterName, FilterOp};
pub use tree::{
    AccessRestriction, DataType, Match, NodeHandle, NodeMetadata, NodeType, SearchResult,
    VssTree, MAX_MATCHES,
};

/// Strip the `?...` query component off a signal path, if present.
pub fn remove_query(path: &str) -> &str {
    match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    }
}

/// Return the `?...` query component of a signal path (including the
/// leading `?`), or an empty string if there is none.
pub fn add_query(path: &str) -> &str {
    match path.find('?') {
        Some(idx) => &path[idx..],
        None => "",
    }
}
