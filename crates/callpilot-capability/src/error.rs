//! Error types for capability calls.

/// Errors raised by a capability call.
///
/// A lookup that finds nothing is *not* an error: it is `Ok(None)` or an
/// empty list.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The capability is not configured or cannot be reached.
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// The bounded wait around the call expired.
    #[error("{capability} timed out after {elapsed_ms} ms")]
    Timeout {
        /// Capability name, e.g. `classify`.
        capability: &'static str,
        /// The bound that expired.
        elapsed_ms: u64,
    },

    /// The backend answered but the answer does not fit the contract.
    #[error("invalid capability response: {0}")]
    InvalidResponse(String),

    /// The backend reported a failure.
    #[error("capability backend error: {0}")]
    Backend(String),

    /// HTTP transport failure talking to a remote backend.
    #[error("capability http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("capability serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CapabilityError {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Http(_) | Self::Backend(_))
    }
}
