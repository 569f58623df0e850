// ── Core error types ──
//
// Errors surfaced by account resolution and export. Transport details from
// `digitall-api` are folded into a handful of domain variants by the
// `From<digitall_api::Error>` impl below.

use thiserror::Error;

use crate::validate::IssueCode;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Missing token (sub)")]
    MissingToken,

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Remote errors ────────────────────────────────────────────────
    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("No data received")]
    NoData,

    #[error("{message}")]
    Network { message: String },

    #[error("Network timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Unexpected response body: {message}")]
    Deserialization { message: String },

    // ── Export errors ────────────────────────────────────────────────
    #[error("Export blocked: profile has {} issue(s) ({})", .issues.len(), issue_keys(.issues))]
    ExportBlocked { issues: Vec<IssueCode> },
}

fn issue_keys(issues: &[IssueCode]) -> String {
    issues
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(", ")
}

impl CoreError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Errors that should never be retried or shown as connectivity trouble.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingToken | Self::Config { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<digitall_api::Error> for CoreError {
    fn from(err: digitall_api::Error) -> Self {
        match err {
            digitall_api::Error::InvalidConfig(message) => CoreError::Config { message },
            digitall_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            digitall_api::Error::Http { status } => CoreError::Http { status },
            digitall_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            digitall_api::Error::Cancelled => CoreError::Cancelled,
            digitall_api::Error::Deserialization { message, .. } => {
                CoreError::Deserialization { message }
            }
            other @ (digitall_api::Error::Transport(_) | digitall_api::Error::Tls(_)) => {
                CoreError::Network {
                    message: other.to_string(),
                }
            }
        }
    }
}
