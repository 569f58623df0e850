//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use digitall_config::ConfigError;
use digitall_core::{CoreError, IssueCode, Locale};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resolution ───────────────────────────────────────────────────
    #[error("No subscription token found")]
    #[diagnostic(
        code(digitall::missing_token),
        help(
            "Pass a panel URL such as https://panel.example/sub/<token>,\n\
             a URL with ?sub=<token>, or the bare token."
        )
    )]
    MissingToken,

    #[error("{message}")]
    #[diagnostic(
        code(digitall::connection_failed),
        help("Could not reach {api}. Retry later or check --api-base.")
    )]
    ConnectionFailed { api: String, message: String },

    #[error("Subscription not found (HTTP 404)")]
    #[diagnostic(
        code(digitall::not_found),
        help("Check that the token is correct and has not been revoked.")
    )]
    NotFound,

    #[error("Server answered HTTP {status}")]
    #[diagnostic(code(digitall::http))]
    Http { status: u16 },

    #[error("Server returned no account data")]
    #[diagnostic(code(digitall::no_data))]
    NoData,

    #[error("Request timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(digitall::timeout),
        help("The server is slow or unreachable; try again later.")
    )]
    Timeout { timeout_ms: u64 },

    #[error("Interrupted")]
    #[diagnostic(code(digitall::interrupted))]
    Interrupted,

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(digitall::response))]
    Response { message: String },

    // ── Profile ──────────────────────────────────────────────────────
    #[error("Profile has {count} issue(s)")]
    #[diagnostic(code(digitall::invalid_profile), help("{details}"))]
    InvalidProfile { count: usize, details: String },

    #[error("Export refused: profile has {count} issue(s)")]
    #[diagnostic(
        code(digitall::export_blocked),
        help("{details}\nRun: digitall validate <URL> for details")
    )]
    ExportBlocked { count: usize, details: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(digitall::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(digitall::config),
        help("Inspect the file with: digitall config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(digitall::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(digitall::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotFound => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::MissingToken | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Translate a resolution failure, using `locale` for connectivity text.
    pub fn from_core(err: CoreError, locale: Locale, api: &str) -> Self {
        match err {
            CoreError::MissingToken => Self::MissingToken,
            CoreError::Http { status: 404 } => Self::NotFound,
            CoreError::Http { status } => Self::Http { status },
            CoreError::NoData => Self::NoData,
            CoreError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            CoreError::Cancelled => Self::Interrupted,
            CoreError::Network { .. } => Self::ConnectionFailed {
                api: api.to_owned(),
                message: digitall_core::resolver::friendly_message(&err, locale),
            },
            CoreError::ExportBlocked { issues } => Self::ExportBlocked {
                count: issues.len(),
                details: describe_issues(&issues, locale),
            },
            CoreError::Config { message } => Self::Validation {
                field: "url".into(),
                reason: message,
            },
            CoreError::Deserialization { message } => Self::Response { message },
        }
    }
}

/// One bullet per issue, in the given locale.
pub fn describe_issues(issues: &[IssueCode], locale: Locale) -> String {
    issues
        .iter()
        .map(|i| format!("- {}", locale.issue_description(*i)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let api = "https://api.example";
        assert_eq!(
            CliError::from_core(CoreError::Http { status: 404 }, Locale::En, api).exit_code(),
            exit_code::NOT_FOUND
        );
        assert_eq!(
            CliError::from_core(CoreError::MissingToken, Locale::En, api).exit_code(),
            exit_code::USAGE
        );
        assert_eq!(
            CliError::from_core(CoreError::Timeout { timeout_ms: 6000 }, Locale::En, api)
                .exit_code(),
            exit_code::TIMEOUT
        );
        assert_eq!(
            CliError::from_core(CoreError::Http { status: 500 }, Locale::En, api).exit_code(),
            exit_code::GENERAL
        );
    }

    #[test]
    fn network_errors_use_friendly_text() {
        let err = CliError::from_core(
            CoreError::Network {
                message: "error sending request: dns error".into(),
            },
            Locale::Fa,
            "https://api.example",
        );
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
        assert_eq!(err.to_string(), Locale::Fa.network_error());
    }

    #[test]
    fn blocked_export_lists_issues() {
        let err = CliError::from_core(
            CoreError::ExportBlocked {
                issues: vec![IssueCode::PrivateMissing, IssueCode::PublicInvalid],
            },
            Locale::En,
            "https://api.example",
        );
        let CliError::ExportBlocked { count, details } = err else {
            panic!("expected ExportBlocked");
        };
        assert_eq!(count, 2);
        assert_eq!(
            details,
            "- Private key is missing\n- Peer public key is malformed or a placeholder"
        );
    }
}
