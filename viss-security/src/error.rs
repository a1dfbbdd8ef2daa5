use thiserror::Error;

/// Errors from bearer-token access verification.
///
/// Each variant maps to one of the four wire error codes spec.md §6 and
/// the original `verifyToken` function define: 1 (missing), 2 (invalid
/// signature), 3 (insufficient scope), 4 (expired).
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("authorization token is missing")]
    MissingToken,

    #[error("authorization token has an invalid signature")]
    InvalidSignature,

    #[error("authorization token does not grant the required scope")]
    InsufficientScope,

    #[error("authorization token has expired")]
    TokenExpired,

    #[error("malformed authorization token: {0}")]
    MalformedToken(String),

    #[error("access-token server request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SecurityError {
    /// The wire error code spec.md §6 attaches to this failure.
    pub fn code(&self) -> u8 {
        match self {
            SecurityError::MissingToken => 1,
            SecurityError::InvalidSignature => 2,
            SecurityError::MalformedToken(_) => 2,
            SecurityError::Transport(_) => 2,
            SecurityError::InsufficientScope => 3,
            SecurityError::TokenExpired => 4,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SecurityError::MissingToken => "No token received.",
            SecurityError::InvalidSignature | SecurityError::MalformedToken(_) | SecurityError::Transport(_) => {
                "Invalid token signature."
            }
            SecurityError::InsufficientScope => "Insufficient token permission.",
            SecurityError::TokenExpired => "Token expired.",
        }
    }
}
