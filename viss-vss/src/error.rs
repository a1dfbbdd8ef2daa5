use thiserror::Error;

/// Errors surfaced while loading or querying the VSS tree.
#[derive(Debug, Error)]
pub enum VssError {
    #[error("failed to read VSS schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse VSS schema file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("VSS schema root node is missing")]
    EmptyTree,
}
