use thiserror::Error;

/// Top-level error type for the `digitall-api` crate.
///
/// Only transport-level failures live here. A server that answers with a
/// non-retryable status is *not* an error: [`fetch_with_retry`] hands that
/// response back for the caller to inspect.
///
/// [`fetch_with_retry`]: crate::retry::fetch_with_retry
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// Invalid retry options (e.g. zero attempts). Never retried.
    #[error("Invalid fetch configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("Network request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A single attempt exceeded its per-attempt timeout.
    #[error("Network timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS or client builder error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP ────────────────────────────────────────────────────────
    /// The server kept answering with a retryable status until the
    /// attempt budget ran out.
    #[error("HTTP {status}")]
    Http { status: u16 },

    // ── Cancellation ────────────────────────────────────────────────
    /// The caller's cancellation token fired.
    #[error("Request cancelled")]
    Cancelled,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the external cancellation token caused this error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_renders_status_only() {
        assert_eq!(Error::Http { status: 503 }.to_string(), "HTTP 503");
    }

    #[test]
    fn only_cancellation_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Timeout { timeout_ms: 10 }.is_cancelled());
        assert!(!Error::InvalidConfig("attempts".into()).is_cancelled());
    }
}
