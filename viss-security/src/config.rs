use std::time::Duration;

/// Configuration for the access-token verifier.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Base URL of the access-token server, e.g. `http://127.0.0.1:8600`.
    pub atserver_url: String,

    /// Request timeout applied to each signature-verification call.
    /// Default: 10 seconds, matching the original's fixed `client.Timeout`.
    pub verify_timeout: Duration,
}

impl SecurityConfig {
    pub fn new(atserver_url: impl Into<String>) -> Self {
        Self {
            atserver_url: atserver_url.into(),
            verify_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    pub(crate) fn atserver_endpoint(&self) -> String {
        format!("{}/atserver", self.atserver_url.trim_end_matches('/'))
    }
}
